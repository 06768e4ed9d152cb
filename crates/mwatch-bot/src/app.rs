//! Application orchestration.
//!
//! Startup order: restore state, fetch and reconcile the full snapshot,
//! persist, then start the stream, command poller and dashboard. The main
//! loop applies stream events until Ctrl+C. Re-seed fetches run on their own
//! task and report back over a channel.

use crate::commands::{CommandHandler, CommandPoller};
use crate::config::AppConfig;
use crate::error::AppResult;
use mwatch_core::{Aspect, Clock, DisplayZone, SnapshotEntry, SystemClock, TrackedState};
use mwatch_dashboard::{run_server, QueryFacade};
use mwatch_feed::{parse_currency_update, ParseStats, Parsed};
use mwatch_notify::{
    LogSink, MessageFormatter, NotificationDispatcher, NotificationSink, Notifier, StartupSummary,
    TelegramClient,
};
use mwatch_persistence::StateStore;
use mwatch_reconcile::{SharedTracker, StateTracker};
use mwatch_registry::{fetch_with_retry, CurrencyClient, RegistryResult, SnapshotSource};
use mwatch_ws::{ConnectionManager, WsMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Stream message channel capacity.
const MESSAGE_CHANNEL_CAPACITY: usize = 1000;

/// Outcome of a background re-seed fetch.
pub type ReseedResult = RegistryResult<Parsed<SnapshotEntry>>;

/// Main application.
pub struct Application {
    config: AppConfig,
    zone: DisplayZone,
    tracker: SharedTracker,
    store: Arc<StateStore>,
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn NotificationSink>,
    telegram: Option<TelegramClient>,
    restored: bool,
    parse_stats: ParseStats,
}

impl Application {
    /// Build the production application: REST snapshot source, Telegram
    /// sink when credentials are set, system clock.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let source: Arc<dyn SnapshotSource> = Arc::new(CurrencyClient::new(
            &config.rest_url,
            config.snapshot.timeout(),
        )?);

        let telegram = if config.telegram.is_usable() {
            Some(TelegramClient::new(
                &config.telegram.bot_token,
                config.telegram.chat_id.clone(),
                Duration::from_millis(config.telegram.request_timeout_ms),
            )?)
        } else {
            if config.telegram.enabled {
                warn!("Telegram enabled but credentials missing, logging notifications");
            }
            None
        };

        let sink: Arc<dyn NotificationSink> = match &telegram {
            Some(client) => Arc::new(client.clone()),
            None => Arc::new(LogSink),
        };

        let mut app = Self::with_components(config, source, sink, Arc::new(SystemClock))?;
        app.telegram = telegram;
        Ok(app)
    }

    /// Build with injected collaborators. Restores persisted state.
    pub fn with_components(
        config: AppConfig,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let zone = config.display.zone()?;
        let store = Arc::new(StateStore::new(&config.persistence.state_file));

        let loaded = store.load(clock.now());
        let restored = loaded.is_some();
        let tracker = StateTracker::shared(loaded.unwrap_or_default(), clock);

        Ok(Self {
            config,
            zone,
            tracker,
            store,
            source,
            sink,
            telegram: None,
            restored,
            parse_stats: ParseStats::default(),
        })
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    /// Whether a persisted state was loaded at construction.
    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn parse_stats(&self) -> &ParseStats {
        &self.parse_stats
    }

    /// Fetch the initial snapshot and reconcile it against the restored
    /// state. Transitions are only announced when a prior state existed.
    /// Retry exhaustion is fatal.
    pub async fn bootstrap(&self, notifier: &Notifier) -> AppResult<StartupSummary> {
        let parsed = fetch_with_retry(
            self.source.as_ref(),
            self.config.snapshot.retry_policy(),
        )
        .await?;

        let outcome = self
            .tracker
            .apply_full_snapshot(&parsed.items, self.restored);
        let queued = notifier.notify_transitions(&outcome.transitions);
        info!(
            transitions = outcome.transitions.len(),
            queued,
            skipped = parsed.skipped + outcome.skipped,
            restored = self.restored,
            "Initial snapshot reconciled"
        );
        self.save();

        Ok(self.summary())
    }

    /// Start a re-seed fetch on its own task. The result is sent on `tx`
    /// for [`Application::apply_reseed`].
    pub fn spawn_reseed(&self, tx: mpsc::Sender<ReseedResult>) -> JoinHandle<()> {
        info!("Re-seeding from snapshot");
        let source = self.source.clone();
        let policy = self.config.snapshot.retry_policy();
        tokio::spawn(async move {
            let result = fetch_with_retry(source.as_ref(), policy).await;
            if tx.send(result).await.is_err() {
                warn!("Main loop gone, dropping re-seed result");
            }
        })
    }

    /// Apply a re-seed snapshot silently.
    pub fn apply_reseed(&self, result: ReseedResult) {
        match result {
            Ok(parsed) => {
                self.tracker.apply_full_snapshot(&parsed.items, false);
                info!(pairs = self.tracker.read(TrackedState::len), "Re-seed complete");
                self.save();
            }
            Err(e) => {
                error!(error = %e, "Re-seed failed, state stays empty until the next reset or restart");
            }
        }
    }

    /// Apply one stream frame. Returns whether the state changed.
    pub fn handle_message(&self, msg: &WsMessage, notifier: &Notifier) -> bool {
        let parsed = match parse_currency_update(msg) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, channel = %msg.channel, "Dropping stream frame");
                return false;
            }
        };
        self.parse_stats.record(&parsed);

        let mut changed = false;
        for event in &parsed.items {
            let outcome = self.tracker.apply_incremental_event(event);
            notifier.notify_transitions(&outcome.transitions);
            changed |= outcome.changed;
        }

        if changed {
            self.save();
        }
        changed
    }

    /// Persist the current state. Failures are logged; the in-memory
    /// state stays authoritative.
    pub fn save(&self) {
        let state = self.tracker.snapshot();
        if let Err(e) = self.store.save(&state) {
            error!(error = %e, path = %self.store.path().display(), "State save failed");
        }
    }

    fn summary(&self) -> StartupSummary {
        self.tracker.read(|state| StartupSummary {
            withdraw_disabled: state.disabled_count(Aspect::Withdraw),
            deposit_disabled: state.disabled_count(Aspect::Deposit),
            total_pairs: state.len(),
            restored: self.restored,
        })
    }

    fn log_status(&self, ws: &ConnectionManager) {
        let summary = self.summary();
        let state = ws.state();
        let heartbeat = ws.heartbeat_stats();
        info!(
            withdraw = summary.withdraw_disabled,
            deposit = summary.deposit_disabled,
            total = summary.total_pairs,
            ws = %state,
            reconnects = ws.reconnect_count(),
            last_frame = ?heartbeat.last_message_at,
            awaiting_pong = heartbeat.waiting_for_pong,
            parsed = self.parse_stats.parsed(),
            skipped = self.parse_stats.skipped(),
            "W:{} D:{} ws={}",
            summary.withdraw_disabled,
            summary.deposit_disabled,
            state,
        );
    }

    /// Run until Ctrl+C.
    pub async fn run(&mut self) -> AppResult<()> {
        info!("Starting maintenance watcher");

        let formatter = MessageFormatter::new(self.zone.clone());
        let (dispatcher, notifier) = NotificationDispatcher::new(
            self.sink.clone(),
            formatter.clone(),
            self.config.notify.queue_capacity,
        );
        let dispatcher_handle = dispatcher.spawn();

        let summary = self.bootstrap(&notifier).await?;
        let _ = notifier.notify(formatter.startup(summary, self.tracker.now()));

        let (message_tx, mut message_rx) = mpsc::channel::<WsMessage>(MESSAGE_CHANNEL_CAPACITY);
        let ws = Arc::new(ConnectionManager::new(
            self.config.websocket.connection_config(&self.config.ws_url),
            message_tx,
        ));
        let ws_clone = ws.clone();
        let ws_handle = tokio::spawn(async move {
            if let Err(e) = ws_clone.connect().await {
                error!(error = %e, "WebSocket task failed");
            }
        });

        let (reseed_tx, mut reseed_rx) = mpsc::channel::<()>(1);
        let (reseed_result_tx, mut reseed_result_rx) = mpsc::channel::<ReseedResult>(1);
        let mut reseed_task: Option<JoinHandle<()>> = None;
        let facade = QueryFacade::new(self.tracker.clone(), self.zone.clone())
            .with_reseed(reseed_tx)
            .with_store(self.store.clone());

        let mut background: Vec<JoinHandle<()>> = Vec::new();
        if self.config.dashboard.enabled {
            let facade = facade.clone();
            let config = self.config.dashboard.clone();
            background.push(tokio::spawn(async move {
                if let Err(e) = run_server(facade, config).await {
                    error!(error = %e, "Dashboard server failed");
                }
            }));
        }
        if let Some(client) = self.telegram.clone() {
            let handler = CommandHandler::new(
                facade.clone(),
                self.tracker.clone(),
                self.store.clone(),
                ws.clone(),
                self.config.telegram.page_size,
            );
            let poller = CommandPoller::new(
                client,
                handler,
                Duration::from_millis(self.config.telegram.poll_interval_ms),
                Duration::from_millis(self.config.telegram.page_delay_ms),
            );
            background.push(tokio::spawn(poller.run()));
        }

        let mut save_interval =
            tokio::time::interval(Duration::from_secs(self.config.persistence.save_interval_secs));
        let mut status_interval =
            tokio::time::interval(Duration::from_secs(self.config.status_interval_secs));
        // The first tick completes immediately.
        save_interval.tick().await;
        status_interval.tick().await;

        info!("Entering main loop");
        loop {
            tokio::select! {
                Some(msg) = message_rx.recv() => {
                    self.handle_message(&msg, &notifier);
                }
                Some(()) = reseed_rx.recv() => {
                    // A newer reset supersedes a fetch still in flight.
                    if let Some(task) = reseed_task.take() {
                        task.abort();
                    }
                    reseed_task = Some(self.spawn_reseed(reseed_result_tx.clone()));
                }
                Some(result) = reseed_result_rx.recv() => {
                    reseed_task = None;
                    self.apply_reseed(result);
                }
                _ = save_interval.tick() => {
                    self.save();
                }
                _ = status_interval.tick() => {
                    self.log_status(&ws);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        if let Some(task) = reseed_task {
            task.abort();
        }
        self.shutdown(ws, ws_handle, background, notifier, dispatcher_handle, &formatter)
            .await;
        Ok(())
    }

    async fn shutdown(
        &self,
        ws: Arc<ConnectionManager>,
        ws_handle: JoinHandle<()>,
        background: Vec<JoinHandle<()>>,
        notifier: Notifier,
        dispatcher_handle: JoinHandle<()>,
        formatter: &MessageFormatter,
    ) {
        let grace = Duration::from_millis(self.config.notify.shutdown_timeout_ms);

        ws.shutdown();
        if tokio::time::timeout(grace, ws_handle).await.is_err() {
            warn!("WebSocket task did not stop in time");
        }
        for handle in background {
            handle.abort();
        }

        self.save();

        // Drain queued notifications, then announce the stop directly.
        drop(notifier);
        if tokio::time::timeout(grace, dispatcher_handle).await.is_err() {
            warn!("Notification queue not drained before shutdown");
        }
        let text = formatter.shutdown(self.tracker.now());
        match tokio::time::timeout(grace, self.sink.deliver(text)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Shutdown notification failed"),
            Err(_) => warn!("Shutdown notification timed out"),
        }

        info!("Application stopped");
    }
}
