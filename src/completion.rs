//! Generative completion client
//!
//! Fallback for messages no matcher claims. Wraps the sender's profile into
//! an advisor prompt and calls Cohere's generate endpoint. Uses a
//! long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use crate::models::UserRecord;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Output-length budget for fallback replies.
pub const MAX_REPLY_TOKENS: u32 = 200;

/// Trait for generative text completion
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Cohere generate client (connection-pooled)
pub struct CohereClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CohereClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.cohere.ai/v1/generate".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

#[async_trait]
impl Completion for CohereClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AssistantError::CompletionError(
                "COHERE_API_KEY not configured".to_string(),
            ));
        }

        let request = GenerateRequest {
            model: "command",
            prompt,
            max_tokens,
        };

        info!("Calling completion API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                AssistantError::CompletionError(format!("Cohere request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::CompletionError(format!(
                "Cohere returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            AssistantError::CompletionError(format!("Invalid completion payload: {}", e))
        })?;

        let answer = generated
            .generations
            .first()
            .ok_or_else(|| {
                AssistantError::CompletionError("Empty completion response".to_string())
            })?
            .text
            .trim()
            .to_string();

        Ok(answer)
    }
}

/// Build the advisor prompt: persona line, a short profile context block,
/// then the raw (non-normalized) message.
pub fn build_prompt(user: &UserRecord, message: &str) -> String {
    format!(
        "You are GenFinBot, a financial advisor.\n\
         User profile: age {}, monthly income ₹{}, monthly expenses ₹{}, credit score {}, loan status {}.\n\
         User: {}\n\
         GenFinBot:",
        user.age,
        user.income_monthly,
        user.expenses_monthly,
        user.credit_score,
        user.loan_status,
        message
    )
}
