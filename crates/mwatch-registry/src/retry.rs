//! Bounded retry for snapshot fetches.

use crate::client::SnapshotSource;
use crate::error::{RegistryError, RegistryResult};
use mwatch_core::SnapshotEntry;
use mwatch_feed::Parsed;
use mwatch_telemetry::Metrics;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

/// Fetch a snapshot, retrying up to `policy.max_attempts` times.
///
/// Returns `RetriesExhausted` carrying the last error when every attempt
/// fails. `max_attempts == 0` is treated as one attempt.
pub async fn fetch_with_retry(
    source: &dyn SnapshotSource,
    policy: RetryPolicy,
) -> RegistryResult<Parsed<SnapshotEntry>> {
    let attempts = policy.max_attempts.max(1);
    let mut last = String::new();

    for attempt in 1..=attempts {
        match source.fetch_snapshot().await {
            Ok(parsed) => {
                Metrics::snapshot_fetch(true);
                info!(
                    attempt,
                    currencies = parsed.items.len(),
                    "Snapshot fetched"
                );
                return Ok(parsed);
            }
            Err(e) => {
                Metrics::snapshot_fetch(false);
                warn!(attempt, max_attempts = attempts, error = %e, "Snapshot fetch failed");
                last = e.to_string();
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(RegistryError::RetriesExhausted { attempts, last })
}
