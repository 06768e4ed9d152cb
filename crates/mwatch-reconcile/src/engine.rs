//! Pure reconciliation logic.
//!
//! Per-aspect transition table (`prev` is `None` when the pair was never
//! observed):
//!
//! | prev                  | observed | next                 | emits   |
//! |-----------------------|----------|----------------------|---------|
//! | `None`                | false    | `Enabled`            | -       |
//! | `None`                | true     | `Disabled { now }`   | -       |
//! | `Enabled`             | false    | `Enabled`            | -       |
//! | `Enabled`             | true     | `Disabled { now }`   | Entered |
//! | `Disabled { since }`  | true     | `Disabled { since }` | -       |
//! | `Disabled { .. }`     | false    | `Enabled`            | Exited  |
//!
//! The first row pair is cold-start silence: nothing is reported against
//! missing knowledge.

use chrono::{DateTime, Utc};
use mwatch_core::{
    Aspect, AspectState, ChainStatus, Direction, IncrementalEvent, PairKey, PairState,
    SnapshotEntry, TrackedState, Transition,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Which source an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Snapshot,
    Incremental,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Incremental => "incremental",
        }
    }
}

/// Result of applying one observation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Transitions in input enumeration order.
    pub transitions: Vec<Transition>,
    /// Whether the tracked state was modified.
    pub changed: bool,
    /// Entries skipped as malformed.
    pub skipped: usize,
}

/// Advance one aspect's state machine.
fn step(
    prev: Option<AspectState>,
    disabled: bool,
    now: DateTime<Utc>,
) -> (AspectState, Option<Direction>) {
    match (prev, disabled) {
        (None, observed) => (AspectState::from_flag(observed, now), None),
        (Some(AspectState::Enabled), false) => (AspectState::Enabled, None),
        (Some(AspectState::Enabled), true) => {
            (AspectState::Disabled { since: now }, Some(Direction::Entered))
        }
        (Some(AspectState::Disabled { since }), true) => (AspectState::Disabled { since }, None),
        (Some(AspectState::Disabled { .. }), false) => {
            (AspectState::Enabled, Some(Direction::Exited))
        }
    }
}

/// Reconcile one pair against its prior state, appending transitions.
fn reconcile_pair(
    key: &PairKey,
    prev: Option<PairState>,
    withdraw_disabled: bool,
    deposit_disabled: bool,
    now: DateTime<Utc>,
    transitions: &mut Vec<Transition>,
) -> PairState {
    let mut next = PairState::default();
    for (aspect, observed) in [
        (Aspect::Withdraw, withdraw_disabled),
        (Aspect::Deposit, deposit_disabled),
    ] {
        let (state, direction) = step(prev.map(|p| p.get(aspect)), observed, now);
        next.set(aspect, state);
        if let Some(direction) = direction {
            debug!(pair = %key, %aspect, %direction, "Aspect transition");
            transitions.push(Transition::new(key.clone(), aspect, direction, now));
        }
    }
    next
}

/// Validated chains of one currency; malformed ones are counted and dropped.
fn valid_chains<'a>(
    currency: &'a str,
    chains: &'a [ChainStatus],
    source: Source,
    skipped: &mut usize,
) -> Vec<(PairKey, &'a ChainStatus)> {
    if currency.trim().is_empty() {
        warn!(
            source = source.as_str(),
            chains = chains.len(),
            "Skipping entry without currency"
        );
        *skipped += 1;
        return Vec::new();
    }

    let mut out = Vec::with_capacity(chains.len());
    for chain in chains {
        let key = PairKey::new(currency, chain.name.clone());
        if !key.is_valid() {
            warn!(
                source = source.as_str(),
                currency = %currency,
                "Skipping chain without name"
            );
            *skipped += 1;
            continue;
        }
        out.push((key, chain));
    }
    out
}

/// Reconcile a full snapshot against the tracked state.
///
/// With `prior_existed == false` every pair is treated as never seen, so no
/// transitions are emitted. Pairs tracked before but absent from `entries`
/// are reconciled as enabled and stay tracked.
pub fn apply_full_snapshot(
    state: &mut TrackedState,
    entries: &[SnapshotEntry],
    prior_existed: bool,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut skipped = 0;

    // First-seen order; a repeated pair keeps its first position and last value.
    let mut order: Vec<PairKey> = Vec::new();
    let mut observed: HashMap<PairKey, (bool, bool)> = HashMap::new();
    for entry in entries {
        for (key, chain) in valid_chains(&entry.currency, &entry.chains, Source::Snapshot, &mut skipped)
        {
            let flags = (chain.withdraw_disabled, chain.deposit_disabled);
            if observed.insert(key.clone(), flags).is_none() {
                order.push(key);
            }
        }
    }

    let prior = |key: &PairKey| -> Option<PairState> {
        if prior_existed {
            state.get(key).copied()
        } else {
            None
        }
    };

    let mut transitions = Vec::new();
    let mut next: BTreeMap<PairKey, PairState> = BTreeMap::new();

    for key in &order {
        let (withdraw, deposit) = observed[key];
        let pair = reconcile_pair(key, prior(key), withdraw, deposit, now, &mut transitions);
        next.insert(key.clone(), pair);
    }

    if prior_existed {
        for (key, prev) in state.iter() {
            if observed.contains_key(key) {
                continue;
            }
            debug!(pair = %key, "Pair absent from snapshot, treating as enabled");
            let pair = reconcile_pair(key, Some(*prev), false, false, now, &mut transitions);
            next.insert(key.clone(), pair);
        }
    }

    debug!(
        observed = order.len(),
        tracked = next.len(),
        transitions = transitions.len(),
        skipped,
        prior_existed,
        "Snapshot reconciled"
    );

    *state = TrackedState::from_parts(next, Some(now));

    ReconcileOutcome {
        transitions,
        changed: true,
        skipped,
    }
}

/// Apply one currency's incremental update.
///
/// `last_update` only moves when the state actually changed, so re-applying
/// the same event leaves the state identical.
pub fn apply_incremental_event(
    state: &mut TrackedState,
    event: &IncrementalEvent,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut skipped = 0;
    let mut transitions = Vec::new();
    let mut changed = false;

    for (key, chain) in valid_chains(&event.currency, &event.chains, Source::Incremental, &mut skipped)
    {
        let prev = state.get(&key).copied();
        let next = reconcile_pair(
            &key,
            prev,
            chain.withdraw_disabled,
            chain.deposit_disabled,
            now,
            &mut transitions,
        );
        if prev != Some(next) {
            state.insert(key, next);
            changed = true;
        }
    }

    if changed {
        state.set_last_update(now);
    }

    ReconcileOutcome {
        transitions,
        changed,
        skipped,
    }
}
