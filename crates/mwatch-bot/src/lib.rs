//! Exchange maintenance watcher.
//!
//! Orchestrates all components:
//! - Persisted state restore
//! - Full snapshot fetch and silent/loud reconciliation
//! - WebSocket status stream
//! - Notification dispatch
//! - Chat commands and HTTP dashboard

pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use app::{Application, ReseedResult};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
