//! Support notifications
//!
//! Fire-and-forget escalation mail, delivered through an HTTP mail relay.
//! Delivery failure is logged by the caller and never blocks the reply.

use crate::error::AssistantError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Trait for outbound notification delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()>;
}

/// HTTP mail-relay client (connection-pooled)
pub struct MailRelayClient {
    client: Client,
    relay_url: String,
}

impl MailRelayClient {
    pub fn new(relay_url: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, relay_url }
    }
}

#[async_trait]
impl Notifier for MailRelayClient {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
        if self.relay_url.is_empty() {
            return Err(AssistantError::NotificationError(
                "MAIL_RELAY_URL not configured".to_string(),
            ));
        }

        let payload = json!({
            "subject": subject,
            "body": body,
            "to": to,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                AssistantError::NotificationError(format!("Mail relay request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AssistantError::NotificationError(format!(
                "Mail relay returned {}",
                response.status()
            )));
        }

        info!(to, "Support notification delivered");
        Ok(())
    }
}
