//! Shared, lock-guarded tracked state.
//!
//! Every apply holds the write lock for its whole read-modify-write, so
//! concurrent sources never interleave within one pair update. Readers get
//! a consistent clone. Notification delivery happens after the lock is
//! released, on the returned transitions.

use crate::engine::{self, ReconcileOutcome, Source};
use chrono::{DateTime, Utc};
use mwatch_core::{Aspect, Clock, IncrementalEvent, SnapshotEntry, TrackedState};
use mwatch_telemetry::Metrics;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

pub type SharedTracker = Arc<StateTracker>;

/// Owner of the tracked maintenance state.
pub struct StateTracker {
    state: RwLock<TrackedState>,
    clock: Arc<dyn Clock>,
}

impl StateTracker {
    pub fn new(initial: TrackedState, clock: Arc<dyn Clock>) -> Self {
        let tracker = Self {
            state: RwLock::new(initial),
            clock,
        };
        tracker.read(record_counts);
        tracker
    }

    pub fn shared(initial: TrackedState, clock: Arc<dyn Clock>) -> SharedTracker {
        Arc::new(Self::new(initial, clock))
    }

    /// Current time from the tracker's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reconcile a full snapshot. See [`engine::apply_full_snapshot`].
    pub fn apply_full_snapshot(
        &self,
        entries: &[SnapshotEntry],
        prior_existed: bool,
    ) -> ReconcileOutcome {
        let outcome = {
            let mut state = self.state.write();
            let now = self.clock.now();
            let outcome = engine::apply_full_snapshot(&mut state, entries, prior_existed, now);
            record_counts(&state);
            outcome
        };
        record_outcome(Source::Snapshot, &outcome);
        info!(
            pairs = entries.len(),
            transitions = outcome.transitions.len(),
            skipped = outcome.skipped,
            prior_existed,
            "Applied full snapshot"
        );
        outcome
    }

    /// Apply one incremental event. See [`engine::apply_incremental_event`].
    pub fn apply_incremental_event(&self, event: &IncrementalEvent) -> ReconcileOutcome {
        let outcome = {
            let mut state = self.state.write();
            let now = self.clock.now();
            let outcome = engine::apply_incremental_event(&mut state, event, now);
            if outcome.changed {
                record_counts(&state);
            }
            outcome
        };
        record_outcome(Source::Incremental, &outcome);
        outcome
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> TrackedState {
        self.state.read().clone()
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&TrackedState) -> R) -> R {
        f(&self.state.read())
    }

    /// Drop all tracked pairs. The next snapshot must be applied with
    /// `prior_existed == false`.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.clear();
        record_counts(&state);
        info!("Tracked state cleared");
    }
}

fn record_counts(state: &TrackedState) {
    Metrics::state_counts(
        state.len(),
        state.disabled_count(Aspect::Withdraw),
        state.disabled_count(Aspect::Deposit),
    );
}

fn record_outcome(source: Source, outcome: &ReconcileOutcome) {
    Metrics::observation_applied(source.as_str());
    for _ in 0..outcome.skipped {
        Metrics::malformed_skipped(source.as_str());
    }
    for transition in &outcome.transitions {
        Metrics::transition(transition.aspect.as_str(), transition.direction.as_str());
        info!(
            pair = %transition.key,
            aspect = %transition.aspect,
            direction = %transition.direction,
            "Maintenance transition"
        );
    }
}
