//! Prometheus metrics for mwatch.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that should crash at
//! first use rather than fail silently.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_int_gauge, register_int_gauge_vec,
    CounterVec, Encoder, Gauge, IntGauge, IntGaugeVec, TextEncoder,
};

/// Transitions emitted by the reconciliation engine.
/// Labels: aspect (withdraw/deposit), direction (entered/exited)
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_transitions_total",
        "Maintenance transitions emitted",
        &["aspect", "direction"]
    )
    .unwrap()
});

/// Observations applied to the tracked state.
/// Labels: source (snapshot/incremental)
pub static OBSERVATIONS_APPLIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_observations_applied_total",
        "Snapshot and incremental observations applied",
        &["source"]
    )
    .unwrap()
});

/// Entries skipped because currency or chain name was missing.
/// Labels: source (snapshot/incremental)
pub static MALFORMED_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_malformed_skipped_total",
        "Malformed entries skipped",
        &["source"]
    )
    .unwrap()
});

/// Number of tracked pairs.
pub static TRACKED_PAIRS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("mwatch_tracked_pairs", "Number of tracked (currency, chain) pairs")
        .unwrap()
});

/// Number of pairs currently in maintenance.
/// Labels: aspect
pub static DISABLED_PAIRS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "mwatch_disabled_pairs",
        "Pairs currently in maintenance",
        &["aspect"]
    )
    .unwrap()
});

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("mwatch_ws_connected", "WebSocket connection state (1=connected)").unwrap()
});

/// Total WebSocket reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Snapshot fetch attempts.
/// Labels: result (ok/error)
pub static SNAPSHOT_FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_snapshot_fetch_total",
        "Snapshot fetch attempts",
        &["result"]
    )
    .unwrap()
});

/// State file saves.
/// Labels: result (ok/error)
pub static STATE_SAVE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("mwatch_state_save_total", "State file saves", &["result"]).unwrap()
});

/// Notification deliveries.
/// Labels: result (sent/failed/dropped)
pub static NOTIFY_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mwatch_notify_total",
        "Notification delivery outcomes",
        &["result"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a transition.
    pub fn transition(aspect: &str, direction: &str) {
        TRANSITIONS_TOTAL
            .with_label_values(&[aspect, direction])
            .inc();
    }

    /// Record an applied observation.
    pub fn observation_applied(source: &str) {
        OBSERVATIONS_APPLIED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record a skipped malformed entry.
    pub fn malformed_skipped(source: &str) {
        MALFORMED_SKIPPED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Update the tracked/disabled gauges.
    pub fn state_counts(tracked: usize, withdraw_disabled: usize, deposit_disabled: usize) {
        TRACKED_PAIRS.set(tracked as i64);
        DISABLED_PAIRS
            .with_label_values(&["withdraw"])
            .set(withdraw_disabled as i64);
        DISABLED_PAIRS
            .with_label_values(&["deposit"])
            .set(deposit_disabled as i64);
    }

    /// Record WebSocket connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record WebSocket disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Record WebSocket reconnection.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a snapshot fetch attempt.
    pub fn snapshot_fetch(ok: bool) {
        let result = if ok { "ok" } else { "error" };
        SNAPSHOT_FETCH_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record a state save.
    pub fn state_save(ok: bool) {
        let result = if ok { "ok" } else { "error" };
        STATE_SAVE_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record a notification outcome (sent/failed/dropped).
    pub fn notify(result: &str) {
        NOTIFY_TOTAL.with_label_values(&[result]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
