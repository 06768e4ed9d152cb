//! Prometheus metrics and structured logging for mwatch.
//!
//! Provides observability from startup:
//! - Prometheus metrics for reconciliation, transport and delivery
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
