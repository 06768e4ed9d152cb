//! Notification error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Bot API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("Notification queue full")]
    QueueFull,

    #[error("Notification queue closed")]
    QueueClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
