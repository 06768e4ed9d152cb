//! Authoritative maintenance state.
//!
//! Each aspect of each pair is a two-state machine: `Enabled` or
//! `Disabled { since }`. A pair that has never been observed is simply absent
//! from `TrackedState`, which is how "unknown" is represented.

use crate::pair::{Aspect, PairKey};
use chrono::{DateTime, Utc};
use std::collections::btree_map::{self, BTreeMap};

/// State of a single aspect of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectState {
    /// Operation available.
    #[default]
    Enabled,
    /// Operation suspended since the given instant.
    Disabled { since: DateTime<Utc> },
}

impl AspectState {
    /// Build from a raw flag and timestamp.
    pub fn from_flag(disabled: bool, since: DateTime<Utc>) -> Self {
        if disabled {
            Self::Disabled { since }
        } else {
            Self::Enabled
        }
    }

    /// Whether the aspect is currently disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled { .. })
    }

    /// Start of the current maintenance window, if disabled.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Enabled => None,
            Self::Disabled { since } => Some(*since),
        }
    }
}

/// Withdraw and deposit state of one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairState {
    pub withdraw: AspectState,
    pub deposit: AspectState,
}

impl PairState {
    /// Create a pair state from both aspects.
    pub fn new(withdraw: AspectState, deposit: AspectState) -> Self {
        Self { withdraw, deposit }
    }

    /// Get the state of one aspect.
    pub fn get(&self, aspect: Aspect) -> AspectState {
        match aspect {
            Aspect::Withdraw => self.withdraw,
            Aspect::Deposit => self.deposit,
        }
    }

    /// Replace the state of one aspect.
    pub fn set(&mut self, aspect: Aspect, state: AspectState) {
        match aspect {
            Aspect::Withdraw => self.withdraw = state,
            Aspect::Deposit => self.deposit = state,
        }
    }
}

/// All pairs ever observed plus the last reconciliation time.
///
/// Backed by a `BTreeMap` so iteration is always ordered by currency, then
/// chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackedState {
    pairs: BTreeMap<PairKey, PairState>,
    last_update: Option<DateTime<Utc>>,
}

impl TrackedState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-validated parts (used when loading from disk).
    pub fn from_parts(
        pairs: BTreeMap<PairKey, PairState>,
        last_update: Option<DateTime<Utc>>,
    ) -> Self {
        Self { pairs, last_update }
    }

    /// Look up a pair. `None` means the pair has never been observed.
    pub fn get(&self, key: &PairKey) -> Option<&PairState> {
        self.pairs.get(key)
    }

    /// Insert or replace a pair.
    pub fn insert(&mut self, key: PairKey, state: PairState) -> Option<PairState> {
        self.pairs.insert(key, state)
    }

    /// Whether the pair has been observed.
    pub fn contains(&self, key: &PairKey) -> bool {
        self.pairs.contains_key(key)
    }

    /// Iterate pairs in (currency, chain) order.
    pub fn iter(&self) -> btree_map::Iter<'_, PairKey, PairState> {
        self.pairs.iter()
    }

    /// Iterate keys in (currency, chain) order.
    pub fn keys(&self) -> btree_map::Keys<'_, PairKey, PairState> {
        self.pairs.keys()
    }

    /// Number of tracked pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair is tracked.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs with the given aspect disabled.
    pub fn disabled_count(&self, aspect: Aspect) -> usize {
        self.pairs
            .values()
            .filter(|p| p.get(aspect).is_disabled())
            .count()
    }

    /// Pairs with the given aspect disabled, with their `since`.
    pub fn disabled(&self, aspect: Aspect) -> Vec<(PairKey, DateTime<Utc>)> {
        self.pairs
            .iter()
            .filter_map(|(k, p)| p.get(aspect).since().map(|since| (k.clone(), since)))
            .collect()
    }

    /// Last reconciliation time.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Record a reconciliation time.
    pub fn set_last_update(&mut self, at: DateTime<Utc>) {
        self.last_update = Some(at);
    }

    /// Drop every pair and the last reconciliation time.
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.last_update = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_aspect_state_invariant() {
        let enabled = AspectState::from_flag(false, t(0));
        assert!(!enabled.is_disabled());
        assert!(enabled.since().is_none());

        let disabled = AspectState::from_flag(true, t(5));
        assert!(disabled.is_disabled());
        assert_eq!(disabled.since(), Some(t(5)));
    }

    #[test]
    fn test_pair_state_get_set() {
        let mut pair = PairState::default();
        pair.set(Aspect::Deposit, AspectState::Disabled { since: t(1) });
        assert!(!pair.get(Aspect::Withdraw).is_disabled());
        assert!(pair.get(Aspect::Deposit).is_disabled());
    }

    #[test]
    fn test_tracked_state_iterates_sorted() {
        let mut state = TrackedState::new();
        state.insert(PairKey::new("ZEC", "ZEC"), PairState::default());
        state.insert(PairKey::new("ABC", "ETH"), PairState::default());
        state.insert(PairKey::new("ABC", "BSC"), PairState::default());

        let keys: Vec<_> = state.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                PairKey::new("ABC", "BSC"),
                PairKey::new("ABC", "ETH"),
                PairKey::new("ZEC", "ZEC"),
            ]
        );
    }

    #[test]
    fn test_disabled_count_and_clear() {
        let mut state = TrackedState::new();
        state.insert(
            PairKey::new("USDT", "TRX"),
            PairState::new(AspectState::Disabled { since: t(0) }, AspectState::Enabled),
        );
        state.insert(
            PairKey::new("BTC", "BTC"),
            PairState::new(
                AspectState::Disabled { since: t(1) },
                AspectState::Disabled { since: t(2) },
            ),
        );
        state.set_last_update(t(3));

        assert_eq!(state.disabled_count(Aspect::Withdraw), 2);
        assert_eq!(state.disabled_count(Aspect::Deposit), 1);
        assert_eq!(state.disabled(Aspect::Deposit), vec![(PairKey::new("BTC", "BTC"), t(2))]);

        state.clear();
        assert!(state.is_empty());
        assert!(state.last_update().is_none());
    }
}
