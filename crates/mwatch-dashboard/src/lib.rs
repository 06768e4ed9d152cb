//! mwatch-dashboard - read-only views over the tracked maintenance state.
//!
//! [`QueryFacade`] is the single entry point for every consumer (chat
//! commands and HTTP). All lists are sorted by currency, then chain.
//!
//! ```text
//!  SharedTracker ──read──▶ QueryFacade ──▶ chat commands
//!                               │
//!                               └──▶ axum server
//!                                     GET  /api/summary
//!                                     GET  /api/disabled/{withdraw|deposit}
//!                                     GET  /api/report
//!                                     GET  /api/state
//!                                     POST /api/reset
//!                                     GET  /metrics
//! ```

mod config;
mod error;
mod facade;
mod report;
mod server;
mod types;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use facade::QueryFacade;
pub use report::render_report;
pub use server::{create_router, run_server};
pub use types::{DisabledPair, Summary};
