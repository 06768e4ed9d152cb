//! Durable storage for the tracked maintenance state.
//!
//! The state is one JSON document rewritten in full on every save
//! (temp file + rename). Loading never fails the process: a missing or
//! unreadable file is a cold start.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use schema::{PairMap, PairRecord, PersistedState};
pub use store::StateStore;
