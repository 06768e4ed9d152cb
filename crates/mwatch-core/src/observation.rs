//! Normalized observations produced by the source adapters.

use serde::{Deserialize, Serialize};

/// Status of one chain of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    /// Chain name (e.g., "TRX").
    pub name: String,
    pub withdraw_disabled: bool,
    pub deposit_disabled: bool,
}

impl ChainStatus {
    pub fn new(name: impl Into<String>, withdraw_disabled: bool, deposit_disabled: bool) -> Self {
        Self {
            name: name.into(),
            withdraw_disabled,
            deposit_disabled,
        }
    }
}

/// One currency's chains from a full snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub currency: String,
    pub chains: Vec<ChainStatus>,
}

impl SnapshotEntry {
    pub fn new(currency: impl Into<String>, chains: Vec<ChainStatus>) -> Self {
        Self {
            currency: currency.into(),
            chains,
        }
    }
}

/// Push-delivered update for one currency's chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalEvent {
    pub currency: String,
    pub chains: Vec<ChainStatus>,
}

impl IncrementalEvent {
    pub fn new(currency: impl Into<String>, chains: Vec<ChainStatus>) -> Self {
        Self {
            currency: currency.into(),
            chains,
        }
    }
}

impl From<SnapshotEntry> for IncrementalEvent {
    fn from(entry: SnapshotEntry) -> Self {
        Self {
            currency: entry.currency,
            chains: entry.chains,
        }
    }
}
