//! Telegram transport
//!
//! Long-polls the Bot API with a reusable reqwest::Client and feeds plain
//! text updates through the engine. Commands are a transport concern and
//! are answered here.

use crate::engine::ConversationEngine;
use crate::error::AssistantError;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const GREETING: &str = "👋 Hello! I'm GenFinBot, your AI finance assistant 💰. \
Ask me anything related to banking, investment, or finance!";

const POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        // Request timeout sits above the long-poll window.
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{}", token),
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AssistantError::TransportError(format!("getUpdates failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::TransportError(format!(
                "getUpdates returned {}",
                response.status()
            )));
        }

        let body: UpdatesResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::TransportError(format!("Invalid updates payload: {}", e)))?;

        if !body.ok {
            return Err(AssistantError::TransportError(
                "getUpdates returned ok=false".to_string(),
            ));
        }

        Ok(body.result)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| AssistantError::TransportError(format!("sendMessage failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::TransportError(format!(
                "sendMessage returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Poll loop; runs until the process is stopped. Transport errors back
    /// off and retry, they never kill the loop.
    pub async fn run(&self, engine: Arc<ConversationEngine>) -> Result<()> {
        let mut offset = 0i64;
        info!("🚀 GenFinBot Telegram is live");

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(error) => {
                    warn!(%error, "getUpdates failed, retrying");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = update.update_id + 1;

                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                let chat_id = message.chat.id;
                let sender_id = chat_id.to_string();

                let reply = if text.trim() == "/start" {
                    GREETING.to_string()
                } else {
                    engine.handle_message(&sender_id, &text).await
                };

                if let Err(error) = self.send_message(chat_id, &reply).await {
                    warn!(chat_id, %error, "sendMessage failed");
                }
            }
        }
    }
}
