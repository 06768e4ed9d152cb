//! Read-only projections over the tracked state, plus reset.

use crate::report::render_report;
use crate::types::{DisabledPair, Summary};
use mwatch_core::{Aspect, DisplayZone};
use mwatch_persistence::{PersistedState, StateStore};
use mwatch_reconcile::SharedTracker;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Query entry point shared by every consumer.
#[derive(Clone)]
pub struct QueryFacade {
    tracker: SharedTracker,
    zone: DisplayZone,
    /// Signals the main loop to re-seed after a reset.
    reseed_tx: Option<mpsc::Sender<()>>,
    /// Receives the cleared state on reset.
    store: Option<Arc<StateStore>>,
}

impl QueryFacade {
    pub fn new(tracker: SharedTracker, zone: DisplayZone) -> Self {
        Self {
            tracker,
            zone,
            reseed_tx: None,
            store: None,
        }
    }

    /// Attach the re-seed channel. Capacity 1 is enough: pending requests
    /// coalesce.
    pub fn with_reseed(mut self, tx: mpsc::Sender<()>) -> Self {
        self.reseed_tx = Some(tx);
        self
    }

    pub fn with_store(mut self, store: Arc<StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn zone(&self) -> &DisplayZone {
        &self.zone
    }

    pub fn list_disabled(&self, aspect: Aspect) -> Vec<DisabledPair> {
        self.tracker.read(|state| {
            state
                .disabled(aspect)
                .into_iter()
                .map(|(key, since)| DisabledPair {
                    currency: key.currency,
                    chain: key.chain,
                    since,
                    since_display: self.zone.format(since),
                })
                .collect()
        })
    }

    pub fn summary(&self) -> Summary {
        self.tracker.read(|state| Summary {
            withdraw_disabled: state.disabled_count(Aspect::Withdraw),
            deposit_disabled: state.disabled_count(Aspect::Deposit),
            total_pairs: state.len(),
            last_update: state.last_update(),
        })
    }

    pub fn export_report(&self) -> String {
        let now = self.tracker.now();
        self.tracker
            .read(|state| render_report(state, &self.zone, now))
    }

    pub fn export_raw_state(&self) -> PersistedState {
        self.tracker.read(PersistedState::from_tracked)
    }

    /// Clear all tracked pairs, persist the empty state and request a
    /// silent re-seed.
    pub fn reset(&self) {
        self.tracker.reset();
        info!("State reset requested");
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.tracker.snapshot()) {
                warn!(error = %e, "Saving reset state failed");
            }
        }
        if let Some(tx) = &self.reseed_tx {
            match tx.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => {
                    warn!("Re-seed channel closed, state stays empty until restart");
                }
            }
        }
    }
}
