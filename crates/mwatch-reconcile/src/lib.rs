//! Maintenance state reconciliation for mwatch.
//!
//! Two entry points feed observations into the tracked state:
//! - `apply_full_snapshot`: full-world reconciliation (startup, re-seed)
//! - `apply_incremental_event`: one currency's chains from the stream
//!
//! `engine` holds the pure transition logic. `tracker` wraps the state in a
//! single lock so every apply runs as one atomic read-modify-write.

pub mod engine;
pub mod tracker;

pub use engine::{apply_full_snapshot, apply_incremental_event, ReconcileOutcome, Source};
pub use tracker::{SharedTracker, StateTracker};
