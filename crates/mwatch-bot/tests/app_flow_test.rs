//! Startup and stream flow tests.
//!
//! Drive `Application` with an in-memory snapshot source and a recording
//! sink:
//! - Cold start stays silent, restart announces differences
//! - Stream events notify and persist
//! - Reset persists the cleared state and re-seeds silently
//! - Stream frames keep applying while a re-seed fetch is pending
//! - Snapshot retry exhaustion is fatal

use chrono::{TimeZone, Utc};
use mwatch_bot::{AppConfig, AppError, Application};
use mwatch_core::{Aspect, ChainStatus, Clock, ManualClock, PairKey, SnapshotEntry};
use mwatch_dashboard::QueryFacade;
use mwatch_feed::Parsed;
use mwatch_notify::{MessageFormatter, NotificationDispatcher, Notifier, RecordingSink};
use mwatch_persistence::StateStore;
use mwatch_registry::{BoxFuture, RegistryError, RegistryResult, SnapshotSource};
use mwatch_ws::WsMessage;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Serves a replaceable snapshot, or fails every fetch when empty.
#[derive(Default)]
struct StaticSource {
    entries: Mutex<Option<Vec<SnapshotEntry>>>,
}

impl StaticSource {
    fn with(entries: Vec<SnapshotEntry>) -> Arc<Self> {
        let source = Self::default();
        source.set(entries);
        Arc::new(source)
    }

    fn set(&self, entries: Vec<SnapshotEntry>) {
        *self.entries.lock().unwrap() = Some(entries);
    }
}

impl SnapshotSource for StaticSource {
    fn fetch_snapshot(&self) -> BoxFuture<'_, RegistryResult<Parsed<SnapshotEntry>>> {
        Box::pin(async move {
            match self.entries.lock().unwrap().clone() {
                Some(items) => Ok(Parsed { items, skipped: 0 }),
                None => Err(RegistryError::HttpClient("connection refused".to_string())),
            }
        })
    }
}

/// Holds every fetch until released.
struct GatedSource {
    gate: Notify,
    entries: Vec<SnapshotEntry>,
}

impl SnapshotSource for GatedSource {
    fn fetch_snapshot(&self) -> BoxFuture<'_, RegistryResult<Parsed<SnapshotEntry>>> {
        Box::pin(async move {
            self.gate.notified().await;
            Ok(Parsed {
                items: self.entries.clone(),
                skipped: 0,
            })
        })
    }
}

fn config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.persistence.state_file = dir.join("state.json").to_string_lossy().into_owned();
    config.snapshot.max_attempts = 2;
    config.snapshot.retry_delay_ms = 10;
    config
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap(),
    ))
}

fn spawn_dispatcher(sink: &Arc<RecordingSink>) -> (Notifier, JoinHandle<()>) {
    let (dispatcher, notifier) =
        NotificationDispatcher::new(sink.clone(), MessageFormatter::default(), 64);
    (notifier, dispatcher.spawn())
}

async fn drain(notifier: Notifier, handle: JoinHandle<()>) {
    drop(notifier);
    handle.await.unwrap();
}

fn entry(currency: &str, chain: &str, withdraw: bool, deposit: bool) -> SnapshotEntry {
    SnapshotEntry::new(currency, vec![ChainStatus::new(chain, withdraw, deposit)])
}

fn update(result: serde_json::Value) -> WsMessage {
    serde_json::from_value(json!({
        "time": 1_700_000_000,
        "channel": "spot.currency_status",
        "event": "update",
        "result": result,
    }))
    .unwrap()
}

#[tokio::test]
async fn test_cold_start_is_silent_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSource::with(vec![
        entry("USDT", "TRX", true, false),
        entry("ABC", "ETH", false, true),
    ]);
    let sink = Arc::new(RecordingSink::new());
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), clock()).unwrap();
    assert!(!app.restored());

    let (notifier, handle) = spawn_dispatcher(&sink);
    let summary = app.bootstrap(&notifier).await.unwrap();
    drain(notifier, handle).await;

    assert_eq!(summary.withdraw_disabled, 1);
    assert_eq!(summary.deposit_disabled, 1);
    assert_eq!(summary.total_pairs, 2);
    assert!(sink.delivered().is_empty());
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_restart_announces_differences() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::new());

    {
        let source = StaticSource::with(vec![
            entry("USDT", "TRX", true, false),
            entry("ABC", "ETH", false, true),
        ]);
        let app = Application::with_components(config(dir.path()), source, sink.clone(), clock())
            .unwrap();
        let (notifier, handle) = spawn_dispatcher(&sink);
        app.bootstrap(&notifier).await.unwrap();
        drain(notifier, handle).await;
    }

    // USDT/TRX withdraw recovered, ABC/ETH deposit still down, XYZ/BSC unseen.
    let source = StaticSource::with(vec![
        entry("USDT", "TRX", false, false),
        entry("ABC", "ETH", false, true),
        entry("XYZ", "BSC", true, false),
    ]);
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), clock()).unwrap();
    assert!(app.restored());

    let (notifier, handle) = spawn_dispatcher(&sink);
    app.bootstrap(&notifier).await.unwrap();
    drain(notifier, handle).await;

    // The unseen pair is tracked without an alert.
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("Keluar Withdraw Maintenance"));
    assert!(delivered[0].contains("USDT (TRX)"));

    let xyz = app
        .tracker()
        .read(|s| s.get(&PairKey::new("XYZ", "BSC")).copied())
        .unwrap();
    assert!(xyz.get(Aspect::Withdraw).is_disabled());
}

#[tokio::test]
async fn test_restored_since_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::new());
    let first = clock();

    let source = StaticSource::with(vec![entry("USDT", "TRX", true, false)]);
    let app = Application::with_components(
        config(dir.path()),
        source.clone(),
        sink.clone(),
        first.clone(),
    )
    .unwrap();
    let (notifier, handle) = spawn_dispatcher(&sink);
    app.bootstrap(&notifier).await.unwrap();
    drain(notifier, handle).await;
    let since = first.now();

    let later = clock();
    later.advance(chrono::Duration::hours(5));
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), later).unwrap();
    let (notifier, handle) = spawn_dispatcher(&sink);
    app.bootstrap(&notifier).await.unwrap();
    drain(notifier, handle).await;

    let pair = app
        .tracker()
        .read(|s| s.get(&PairKey::new("USDT", "TRX")).copied())
        .unwrap();
    assert_eq!(pair.get(Aspect::Withdraw).since(), Some(since));
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn test_stream_event_notifies_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSource::with(vec![entry("USDT", "TRX", false, false)]);
    let sink = Arc::new(RecordingSink::new());
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), clock()).unwrap();

    let (notifier, handle) = spawn_dispatcher(&sink);
    app.bootstrap(&notifier).await.unwrap();

    let msg = update(json!({
        "currency": "USDT",
        "chains": [
            {"name": "TRX", "withdraw_disabled": true, "deposit_disabled": false},
            {"withdraw_disabled": true}
        ]
    }));
    assert!(app.handle_message(&msg, &notifier));
    // Same status again is a no-op.
    assert!(!app.handle_message(&msg, &notifier));
    drain(notifier, handle).await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("Masuk Withdraw Maintenance"));
    assert_eq!(app.parse_stats().skipped(), 2);

    let saved = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved["withdraw_times"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wrong_channel_frame_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSource::with(vec![]);
    let sink = Arc::new(RecordingSink::new());
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), clock()).unwrap();

    let (notifier, handle) = spawn_dispatcher(&sink);
    let msg: WsMessage = serde_json::from_value(json!({
        "channel": "spot.tickers",
        "event": "update",
        "result": {"currency": "USDT"}
    }))
    .unwrap();
    assert!(!app.handle_message(&msg, &notifier));
    drain(notifier, handle).await;
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn test_reset_reseeds_silently() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSource::with(vec![entry("USDT", "TRX", true, false)]);
    let sink = Arc::new(RecordingSink::new());
    let app = Application::with_components(
        config(dir.path()),
        source.clone(),
        sink.clone(),
        clock(),
    )
    .unwrap();

    let (notifier, handle) = spawn_dispatcher(&sink);
    app.bootstrap(&notifier).await.unwrap();

    let store = Arc::new(StateStore::new(dir.path().join("state.json")));
    let (reseed_tx, mut reseed_rx) = mpsc::channel(1);
    let facade = QueryFacade::new(app.tracker().clone(), mwatch_core::DisplayZone::wib())
        .with_reseed(reseed_tx)
        .with_store(store.clone());

    source.set(vec![
        entry("USDT", "TRX", false, false),
        entry("ABC", "ETH", true, true),
    ]);
    facade.reset();
    assert_eq!(facade.summary().total_pairs, 0);
    assert_eq!(store.load(clock().now()).map(|s| s.len()), Some(0));

    reseed_rx.recv().await.unwrap();
    let (result_tx, mut result_rx) = mpsc::channel(1);
    app.spawn_reseed(result_tx).await.unwrap();
    app.apply_reseed(result_rx.recv().await.unwrap());
    drain(notifier, handle).await;

    let summary = facade.summary();
    assert_eq!(summary.total_pairs, 2);
    assert_eq!(summary.withdraw_disabled, 1);
    assert_eq!(summary.deposit_disabled, 1);
    assert!(sink.delivered().is_empty());
    assert_eq!(store.load(clock().now()).map(|s| s.len()), Some(2));
}

#[tokio::test]
async fn test_stream_applies_while_reseed_pending() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(GatedSource {
        gate: Notify::new(),
        entries: vec![entry("ABC", "ETH", true, false)],
    });
    let sink = Arc::new(RecordingSink::new());
    let app = Application::with_components(
        config(dir.path()),
        source.clone(),
        sink.clone(),
        clock(),
    )
    .unwrap();
    let (notifier, handle) = spawn_dispatcher(&sink);

    let (result_tx, mut result_rx) = mpsc::channel(1);
    let task = app.spawn_reseed(result_tx);

    let msg = update(json!({
        "currency": "USDT",
        "chains": [{"name": "TRX", "withdraw_disabled": true, "deposit_disabled": false}]
    }));
    app.handle_message(&msg, &notifier);
    let usdt = app
        .tracker()
        .read(|s| s.get(&PairKey::new("USDT", "TRX")).copied());
    assert!(usdt.is_some());
    assert!(result_rx.try_recv().is_err());

    source.gate.notify_one();
    app.apply_reseed(result_rx.recv().await.unwrap());
    task.await.unwrap();
    drain(notifier, handle).await;

    let abc = app
        .tracker()
        .read(|s| s.get(&PairKey::new("ABC", "ETH")).copied())
        .unwrap();
    assert!(abc.get(Aspect::Withdraw).is_disabled());
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn test_snapshot_exhaustion_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(StaticSource::default());
    let sink = Arc::new(RecordingSink::new());
    let app =
        Application::with_components(config(dir.path()), source, sink.clone(), clock()).unwrap();

    let (notifier, handle) = spawn_dispatcher(&sink);
    let result = app.bootstrap(&notifier).await;
    drain(notifier, handle).await;

    assert!(matches!(
        result,
        Err(AppError::Snapshot(RegistryError::RetriesExhausted { attempts: 2, .. }))
    ));
    assert!(!dir.path().join("state.json").exists());
}
