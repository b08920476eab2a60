//! Market data lookup
//!
//! Resolves company mentions to tickers and fetches live quotes from
//! Finnhub. Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Fixed company-name → ticker table, first match wins.
pub const SYMBOLS: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("tesla", "TSLA"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("amazon", "AMZN"),
    ("reliance", "RELIANCE.NS"),
    ("tcs", "TCS.NS"),
    ("infosys", "INFY.NS"),
    ("infy", "INFY.NS"),
    ("wipro", "WIPRO.NS"),
];

/// Resolve the first table entry mentioned in the normalized message.
pub fn resolve_symbol(normalized: &str) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(name, _)| normalized.contains(name))
        .map(|(_, symbol)| *symbol)
}

#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub price: f64,
    pub change_pct: Option<f64>,
}

/// Trait for live quote lookup
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote>;
}

/// Finnhub quote client (connection-pooled)
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://finnhub.io/api/v1/quote".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// Current price
    c: f64,
    /// Percent change since previous close
    dp: Option<f64>,
}

#[async_trait]
impl MarketData for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        if self.api_key.is_empty() {
            return Err(AssistantError::MarketDataError(
                "FINNHUB_API_KEY not configured".to_string(),
            ));
        }

        info!(symbol, "Fetching quote");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(symbol, "Quote request failed: {}", e);
                AssistantError::MarketDataError(format!("Finnhub request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::MarketDataError(format!(
                "Finnhub returned {}: {}",
                status, body
            )));
        }

        let quote: FinnhubQuote = response.json().await.map_err(|e| {
            AssistantError::MarketDataError(format!("Invalid quote payload: {}", e))
        })?;

        // Finnhub reports 0.0 for unknown symbols rather than an error.
        if quote.c == 0.0 {
            return Err(AssistantError::MarketDataError(format!(
                "No price data for {}",
                symbol
            )));
        }

        Ok(Quote {
            price: quote.c,
            change_pct: quote.dp,
        })
    }
}

/// Render a quote line for the reply.
pub fn format_quote(symbol: &str, quote: &Quote) -> String {
    match quote.change_pct {
        Some(dp) => format!(
            "📈 {} is trading at ₹{:.2} ({:+.2}% change)",
            symbol, quote.price, dp
        ),
        None => format!("📈 {} is trading at ₹{:.2}", symbol, quote.price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_symbol_first_match_in_table_order() {
        assert_eq!(resolve_symbol("what is the apple stock price"), Some("AAPL"));
        assert_eq!(resolve_symbol("share price of infy today"), Some("INFY.NS"));
        // "apple" precedes "tcs" in the table.
        assert_eq!(resolve_symbol("apple vs tcs stock"), Some("AAPL"));
        assert_eq!(resolve_symbol("price of doge"), None);
    }

    #[test]
    fn test_format_quote() {
        let quote = Quote {
            price: 187.5,
            change_pct: Some(1.25),
        };
        assert_eq!(
            format_quote("AAPL", &quote),
            "📈 AAPL is trading at ₹187.50 (+1.25% change)"
        );

        let flat = Quote {
            price: 42.0,
            change_pct: None,
        };
        assert_eq!(format_quote("TCS.NS", &flat), "📈 TCS.NS is trading at ₹42.00");
    }
}
