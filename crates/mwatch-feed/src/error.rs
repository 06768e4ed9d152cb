//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("Wrong channel: {0}")]
    WrongChannel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
