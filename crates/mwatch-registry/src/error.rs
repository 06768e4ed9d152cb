//! Registry error types.

use mwatch_feed::FeedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Payload error: {0}")]
    Payload(#[from] FeedError),

    #[error("Snapshot unavailable after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
