//! Currency status payload normalization.
//!
//! Turns the REST `spot/currencies` array and `spot.currency_status` update
//! frames into the observation types the reconciler consumes. Malformed
//! entries are dropped here, logged and counted, and never fail a batch.

pub mod error;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use parser::{
    parse_currency_update, parse_snapshot, parse_snapshot_value, ParseStats, Parsed, RawChain,
    RawCurrency,
};
