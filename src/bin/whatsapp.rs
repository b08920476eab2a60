use genfin_bot::{
    api::start_server, completion::CohereClient, directory, engine::ConversationEngine,
    market::FinnhubClient, notify::MailRelayClient,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()?;

    let finnhub_key = std::env::var("FINNHUB_API_KEY").unwrap_or_default();
    let cohere_key = std::env::var("COHERE_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  COHERE_API_KEY not set in .env - AI fallback will apologize");
        String::new()
    });
    let relay_url = std::env::var("MAIL_RELAY_URL").unwrap_or_default();
    let support_email =
        std::env::var("SUPPORT_EMAIL").unwrap_or_else(|_| "support@genfin.example".to_string());

    info!("🚀 GenFinBot - WhatsApp webhook");
    info!("📍 Port: {}", port);

    // Create components
    let engine = Arc::new(ConversationEngine::new(
        directory::from_env(),
        Arc::new(FinnhubClient::new(finnhub_key)),
        Arc::new(CohereClient::new(cohere_key)),
        Arc::new(MailRelayClient::new(relay_url)),
        support_email,
    ));

    info!("✅ Engine initialized");

    start_server(engine, port).await?;

    Ok(())
}
