//! Detected status flips.

use crate::pair::{Aspect, PairKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The aspect went into maintenance.
    Entered,
    /// The aspect came out of maintenance.
    Exited,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entered => "entered",
            Self::Exited => "exited",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A flip of one aspect's disabled flag.
///
/// Produced by the reconciliation engine and consumed once by the notifier.
/// Never persisted: its effect lives on in `AspectState::Disabled { since }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub key: PairKey,
    pub aspect: Aspect,
    pub direction: Direction,
    pub at: DateTime<Utc>,
}

impl Transition {
    pub fn new(key: PairKey, aspect: Aspect, direction: Direction, at: DateTime<Utc>) -> Self {
        Self {
            key,
            aspect,
            direction,
            at,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} at {}",
            self.key,
            self.aspect,
            self.direction,
            self.at.to_rfc3339()
        )
    }
}
