//! WhatsApp webhook server
//!
//! Thin Twilio-facing transport: form post in, TwiML out. All conversation
//! logic lives in the engine.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::ConversationEngine;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ConversationEngine>,
}

#[derive(Debug, Deserialize)]
pub struct TwilioForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// Twilio sender ids arrive as `whatsapp:+91909xxxxxxx`; strip the
/// transport scheme and country prefix to recover the stored phone number.
fn sender_id_from_twilio(from: &str) -> String {
    from.trim_start_matches("whatsapp:")
        .trim_start_matches("+91")
        .to_string()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn twiml(reply: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(reply)
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn whatsapp_reply(
    State(state): State<ApiState>,
    Form(form): Form<TwilioForm>,
) -> impl IntoResponse {
    let sender_id = sender_id_from_twilio(&form.from);
    info!(sender_id = %sender_id, "WhatsApp message received");

    let reply = state.engine.handle_message(&sender_id, &form.body).await;

    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml(&reply),
    )
}

pub fn create_router(engine: Arc<ConversationEngine>) -> Router {
    let state = ApiState { engine };

    Router::new()
        .route("/health", get(health))
        .route("/whatsapp", post(whatsapp_reply))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn start_server(
    engine: Arc<ConversationEngine>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(engine);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("WhatsApp webhook listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
