//! Core domain types for the exchange maintenance watcher.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `PairKey`: Structural (currency, chain) identifier
//! - `Aspect`: Withdraw or deposit capability
//! - `AspectState`, `PairState`, `TrackedState`: Authoritative maintenance state
//! - `SnapshotEntry`, `IncrementalEvent`: Normalized observations from the sources
//! - `Transition`: A detected flip of an aspect's disabled flag

pub mod clock;
pub mod display;
pub mod error;
pub mod observation;
pub mod pair;
pub mod state;
pub mod transition;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display::DisplayZone;
pub use error::{CoreError, Result};
pub use observation::{ChainStatus, IncrementalEvent, SnapshotEntry};
pub use pair::{Aspect, PairKey};
pub use state::{AspectState, PairState, TrackedState};
pub use transition::{Direction, Transition};
