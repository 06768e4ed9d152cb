//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] mwatch_registry::RegistryError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] mwatch_ws::WsError),

    #[error("Feed error: {0}")]
    Feed(#[from] mwatch_feed::FeedError),

    #[error("Notification error: {0}")]
    Notify(#[from] mwatch_notify::NotifyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mwatch_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] mwatch_persistence::PersistenceError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] mwatch_dashboard::DashboardError),

    #[error("Core error: {0}")]
    Core(#[from] mwatch_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
