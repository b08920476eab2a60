//! Error types for the assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Registration error: {0}")]
    RegistrationError(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Market data error: {0}")]
    MarketDataError(String),

    #[error("Completion error: {0}")]
    CompletionError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
