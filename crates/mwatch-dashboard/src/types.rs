//! Response types shared by the chat and HTTP surfaces.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One pair currently in maintenance for an aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisabledPair {
    pub currency: String,
    pub chain: String,
    pub since: DateTime<Utc>,
    /// `since` in the display zone.
    pub since_display: String,
}

/// Headline counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub withdraw_disabled: usize,
    pub deposit_disabled: usize,
    pub total_pairs: usize,
    pub last_update: Option<DateTime<Utc>>,
}
