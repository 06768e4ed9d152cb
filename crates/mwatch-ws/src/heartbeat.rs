//! Application-level heartbeat.
//!
//! The server does not push anything on a quiet channel, so liveness is
//! checked with `spot.ping`. A ping is only sent after `interval` of
//! silence, and an unanswered ping older than `timeout` marks the
//! connection dead.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct Inner {
    last_message: Instant,
    last_message_at: Option<DateTime<Utc>>,
    ping_sent: Option<Instant>,
}

/// Heartbeat tracker for one connection.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval: Duration,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            inner: Mutex::new(Inner {
                last_message: Instant::now(),
                last_message_at: None,
                ping_sent: None,
            }),
        }
    }

    /// Called on every new connection.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.last_message = Instant::now();
        inner.ping_sent = None;
    }

    pub fn record_ping(&self) {
        self.inner.lock().ping_sent = Some(Instant::now());
    }

    pub fn record_pong(&self) {
        let mut inner = self.inner.lock();
        if let Some(sent) = inner.ping_sent.take() {
            debug!(rtt_ms = sent.elapsed().as_millis() as u64, "Received pong");
        }
    }

    /// Any inbound frame counts as liveness.
    pub fn record_message(&self) {
        let mut inner = self.inner.lock();
        inner.last_message = Instant::now();
        inner.last_message_at = Some(Utc::now());
    }

    pub fn is_timed_out(&self) -> bool {
        self.inner
            .lock()
            .ping_sent
            .is_some_and(|sent| sent.elapsed() > self.timeout)
    }

    pub fn should_send_ping(&self) -> bool {
        let inner = self.inner.lock();
        inner.ping_sent.is_none() && inner.last_message.elapsed() >= self.interval
    }

    /// Sleep until the next liveness check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(self.interval / 2).await;
    }

    pub fn stats(&self) -> HeartbeatStats {
        let inner = self.inner.lock();
        HeartbeatStats {
            last_message_at: inner.last_message_at,
            waiting_for_pong: inner.ping_sent.is_some(),
        }
    }
}

/// Heartbeat snapshot for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatStats {
    pub last_message_at: Option<DateTime<Utc>>,
    pub waiting_for_pong: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_connection_not_timed_out() {
        let hb = HeartbeatManager::new(20_000, 10_000);
        assert!(!hb.is_timed_out());
        assert!(!hb.should_send_ping());
        assert!(!hb.stats().waiting_for_pong);
    }

    #[test]
    fn test_ping_pong_cycle() {
        let hb = HeartbeatManager::new(0, 10_000);
        assert!(hb.should_send_ping());

        hb.record_ping();
        assert!(hb.stats().waiting_for_pong);
        assert!(!hb.should_send_ping());

        hb.record_pong();
        assert!(!hb.stats().waiting_for_pong);
    }

    #[test]
    fn test_unanswered_ping_times_out() {
        let hb = HeartbeatManager::new(0, 0);
        hb.record_ping();
        std::thread::sleep(Duration::from_millis(5));
        assert!(hb.is_timed_out());
    }

    #[test]
    fn test_record_message_sets_timestamp() {
        let hb = HeartbeatManager::new(20_000, 10_000);
        assert!(hb.stats().last_message_at.is_none());
        hb.record_message();
        assert!(hb.stats().last_message_at.is_some());
    }
}
