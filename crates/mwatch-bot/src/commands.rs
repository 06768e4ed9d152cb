//! Chat commands over the Bot API long-poll.
//!
//! Commands are read-only views over the tracked state, except `/reset`.
//! Replies are built by [`CommandHandler`] and delivered by [`CommandPoller`].

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use mwatch_core::Aspect;
use mwatch_dashboard::{DisabledPair, QueryFacade};
use mwatch_notify::{escape_html, TelegramClient};
use mwatch_persistence::StateStore;
use mwatch_reconcile::SharedTracker;
use mwatch_ws::ConnectionManager;
use tracing::{debug, info, warn};

const EMPTY_LINE: &str = "✅ Tidak ada coin dalam maintenance";
const EXPORT_FAILED: &str = "❌ Gagal mengirim file";

/// Long-poll wait passed to `getUpdates`. Must stay below the client
/// request timeout.
pub const LONG_POLL_SECS: u64 = 10;

const HELP: &str = "🤖 <b>Gate.io Maintenance Bot</b>\n\n\
📋 <b>Commands:</b>\n\
/withdraw - List withdraw maintenance\n\
/deposit - List deposit maintenance\n\
/export - Download maintenance.txt\n\
/export_json - Download state JSON\n\
/status - Bot status\n\
/reset - Reset state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Withdraw,
    Deposit,
    Export,
    ExportJson,
    Status,
    Reset,
}

impl Command {
    /// Parse the first word of a message. Accepts `/cmd@botname`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(cmd, _)| cmd);
        match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Some(Self::Start),
            "withdraw" => Some(Self::Withdraw),
            "deposit" => Some(Self::Deposit),
            "export" => Some(Self::Export),
            "export_json" => Some(Self::ExportJson),
            "status" => Some(Self::Status),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// One outgoing chat item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Document {
        file_name: String,
        bytes: Vec<u8>,
        caption: String,
    },
}

/// Builds replies from the query facade.
pub struct CommandHandler {
    facade: QueryFacade,
    tracker: SharedTracker,
    store: Arc<StateStore>,
    ws: Arc<ConnectionManager>,
    page_size: usize,
}

impl CommandHandler {
    pub fn new(
        facade: QueryFacade,
        tracker: SharedTracker,
        store: Arc<StateStore>,
        ws: Arc<ConnectionManager>,
        page_size: usize,
    ) -> Self {
        Self {
            facade,
            tracker,
            store,
            ws,
            page_size: page_size.max(1),
        }
    }

    pub fn handle(&self, command: Command) -> Vec<Reply> {
        match command {
            Command::Start => vec![Reply::Text(HELP.to_string())],
            Command::Withdraw => self.list(Aspect::Withdraw),
            Command::Deposit => self.list(Aspect::Deposit),
            Command::Export => self.export_report(),
            Command::ExportJson => self.export_json(),
            Command::Status => vec![Reply::Text(self.status())],
            Command::Reset => {
                warn!("State reset via chat command");
                self.facade.reset();
                vec![Reply::Text(
                    "✅ State reset! Re-seeding from snapshot.".to_string(),
                )]
            }
        }
    }

    fn now_display(&self) -> String {
        self.facade.zone().format(self.tracker.now())
    }

    fn list(&self, aspect: Aspect) -> Vec<Reply> {
        let header = match aspect {
            Aspect::Withdraw => "📤 <b>WITHDRAW MAINTENANCE</b>",
            Aspect::Deposit => "📥 <b>DEPOSIT MAINTENANCE</b>",
        };
        paginate(
            header,
            &self.now_display(),
            &self.facade.list_disabled(aspect),
            self.page_size,
        )
        .into_iter()
        .map(Reply::Text)
        .collect()
    }

    fn counts_caption(&self, title: &str) -> String {
        let summary = self.facade.summary();
        format!(
            "{title}\n📅 {}\n📤 Withdraw: {} | 📥 Deposit: {}",
            self.now_display(),
            summary.withdraw_disabled,
            summary.deposit_disabled,
        )
    }

    fn export_report(&self) -> Vec<Reply> {
        vec![
            Reply::Text("⏳ Generating file...".to_string()),
            Reply::Document {
                file_name: "maintenance.txt".to_string(),
                bytes: self.facade.export_report().into_bytes(),
                caption: self.counts_caption("📊 Maintenance Report"),
            },
        ]
    }

    fn export_json(&self) -> Vec<Reply> {
        let state = self.tracker.snapshot();
        if let Err(e) = self.store.save(&state) {
            warn!(error = %e, "Save before JSON export failed");
        }
        match StateStore::to_json(&state) {
            Ok(json) => vec![Reply::Document {
                file_name: file_name_of(&self.store),
                bytes: json.into_bytes(),
                caption: self.counts_caption("📊 State JSON"),
            }],
            Err(e) => {
                warn!(error = %e, "State JSON export failed");
                vec![Reply::Text(EXPORT_FAILED.to_string())]
            }
        }
    }

    fn status(&self) -> String {
        let summary = self.facade.summary();
        let ws = if self.ws.state().is_connected() {
            "🟢 Connected"
        } else {
            "🔴 Disconnected"
        };
        let last_frame = self
            .ws
            .heartbeat_stats()
            .last_message_at
            .map(|at| self.facade.zone().format(at))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "📊 <b>BOT STATUS</b>\n\n\
             📅 Time: {}\n\
             🔌 WebSocket: {ws}\n\
             📨 Last frame: {last_frame}\n\
             🔄 Reconnects: {}\n\
             📤 Withdraw: {}\n\
             📥 Deposit: {}\n\
             📊 Total: {} chains",
            self.now_display(),
            self.ws.reconnect_count(),
            summary.withdraw_disabled,
            summary.deposit_disabled,
            summary.total_pairs,
        )
    }
}

fn file_name_of(store: &StateStore) -> String {
    store
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "maintenance_state.json".to_string())
}

/// Split a disabled list into messages of at most `page_size` lines.
/// Numbering continues across pages; only the first carries the total.
pub fn paginate(
    header: &str,
    now: &str,
    pairs: &[DisabledPair],
    page_size: usize,
) -> Vec<String> {
    if pairs.is_empty() {
        return vec![format!("{header}\n📅 {now}\n\n{EMPTY_LINE}")];
    }

    let page_size = page_size.max(1);
    pairs
        .chunks(page_size)
        .enumerate()
        .map(|(page, chunk)| {
            let mut msg = if page == 0 {
                format!("{header}\n📅 {now}\n📊 Total: {} chains\n\n", pairs.len())
            } else {
                String::new()
            };
            for (i, pair) in chunk.iter().enumerate() {
                let _ = writeln!(
                    msg,
                    "{}. {} - {} | {}",
                    page * page_size + i + 1,
                    escape_html(&pair.currency),
                    escape_html(&pair.chain),
                    pair.since_display,
                );
            }
            msg
        })
        .collect()
}

/// Polls `getUpdates` and answers commands from the configured chat.
pub struct CommandPoller {
    client: TelegramClient,
    handler: CommandHandler,
    poll_interval: Duration,
    page_delay: Duration,
}

impl CommandPoller {
    pub fn new(
        client: TelegramClient,
        handler: CommandHandler,
        poll_interval: Duration,
        page_delay: Duration,
    ) -> Self {
        Self {
            client,
            handler,
            poll_interval,
            page_delay,
        }
    }

    /// Poll forever. Errors are logged and polling resumes after the
    /// poll interval.
    pub async fn run(self) {
        info!("Command poller started");
        let mut offset: Option<i64> = None;
        loop {
            match self.client.get_updates(offset, LONG_POLL_SECS).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let Some(message) = update.message else {
                            continue;
                        };
                        let chat_id = message.chat.id.to_string();
                        if chat_id != self.client.chat_id() {
                            debug!(%chat_id, "Ignoring message from unknown chat");
                            continue;
                        }
                        let Some(command) = message.text.as_deref().and_then(Command::parse)
                        else {
                            continue;
                        };
                        info!(?command, "Chat command");
                        self.deliver(&chat_id, self.handler.handle(command)).await;
                    }
                }
                Err(e) => warn!(error = %e, "getUpdates failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn deliver(&self, chat_id: &str, replies: Vec<Reply>) {
        let multi_page = replies.len() > 1;
        for (i, reply) in replies.into_iter().enumerate() {
            if i > 0 && multi_page {
                tokio::time::sleep(self.page_delay).await;
            }
            match reply {
                Reply::Text(text) => {
                    if let Err(e) = self.client.send_message_to(chat_id, &text).await {
                        warn!(error = %e, "Command reply failed");
                    }
                }
                Reply::Document {
                    file_name,
                    bytes,
                    caption,
                } => {
                    if let Err(e) = self
                        .client
                        .send_document(chat_id, &file_name, bytes, &caption)
                        .await
                    {
                        warn!(error = %e, %file_name, "Document upload failed");
                        let _ = self.client.send_message_to(chat_id, EXPORT_FAILED).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mwatch_core::{ChainStatus, DisplayZone, ManualClock, SnapshotEntry, TrackedState};
    use mwatch_reconcile::StateTracker;
    use mwatch_ws::ConnectionConfig;
    use tokio::sync::mpsc;

    fn pair(currency: &str, chain: &str) -> DisabledPair {
        let since = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        DisabledPair {
            currency: currency.to_string(),
            chain: chain.to_string(),
            since,
            since_display: DisplayZone::wib().format(since),
        }
    }

    fn handler(dir: &tempfile::TempDir) -> CommandHandler {
        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        let tracker = StateTracker::shared(TrackedState::new(), clock);
        tracker.apply_full_snapshot(
            &[
                SnapshotEntry::new("USDT", vec![ChainStatus::new("TRX", true, false)]),
                SnapshotEntry::new("ABC", vec![ChainStatus::new("ETH", false, true)]),
            ],
            false,
        );
        let zone = DisplayZone::wib();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let (tx, _rx) = mpsc::channel(1);
        let ws = Arc::new(ConnectionManager::new(ConnectionConfig::default(), tx));
        let facade = QueryFacade::new(tracker.clone(), zone);
        CommandHandler::new(facade, tracker, store, ws, 50)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/withdraw"), Some(Command::Withdraw));
        assert_eq!(Command::parse("/export_json@gate_bot"), Some(Command::ExportJson));
        assert_eq!(Command::parse("  /STATUS now"), Some(Command::Status));
        assert_eq!(Command::parse("/help"), Some(Command::Start));
        assert_eq!(Command::parse("withdraw"), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_paginate_empty() {
        let pages = paginate("HDR", "now", &[], 50);
        assert_eq!(pages, vec![format!("HDR\n📅 now\n\n{EMPTY_LINE}")]);
    }

    #[test]
    fn test_paginate_continues_numbering() {
        let pairs: Vec<_> = (0..5).map(|i| pair(&format!("C{i}"), "ETH")).collect();
        let pages = paginate("HDR", "now", &pairs, 2);

        assert_eq!(pages.len(), 3);
        assert!(pages[0].starts_with("HDR\n📅 now\n📊 Total: 5 chains\n\n1. C0 - ETH | "));
        assert!(pages[1].starts_with("3. C2 - ETH"));
        assert!(!pages[1].contains("Total"));
        assert!(pages[2].starts_with("5. C4 - ETH"));
    }

    #[test]
    fn test_paginate_escapes_names() {
        let pages = paginate("HDR", "now", &[pair("A<B", "X&Y")], 50);
        assert!(pages[0].contains("1. A&lt;B - X&amp;Y | 2023-11-15 05:13:20 WIB"));
    }

    #[test]
    fn test_withdraw_list_reply() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handler(&dir).handle(Command::Withdraw);
        assert_eq!(replies.len(), 1);
        let Reply::Text(text) = &replies[0] else {
            panic!("expected text reply");
        };
        assert!(text.starts_with("📤 <b>WITHDRAW MAINTENANCE</b>"));
        assert!(text.contains("1. USDT - TRX | 2023-11-15 05:13:20 WIB"));
    }

    #[test]
    fn test_status_reply() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handler(&dir).handle(Command::Status);
        let Reply::Text(text) = &replies[0] else {
            panic!("expected text reply");
        };
        assert!(text.contains("🔌 WebSocket: 🔴 Disconnected"));
        assert!(text.contains("📨 Last frame: -"));
        assert!(text.contains("🔄 Reconnects: 0"));
        assert!(text.contains("📤 Withdraw: 1"));
        assert!(text.contains("📥 Deposit: 1"));
        assert!(text.contains("📊 Total: 2 chains"));
    }

    #[test]
    fn test_export_sends_progress_then_report() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handler(&dir).handle(Command::Export);
        assert_eq!(replies[0], Reply::Text("⏳ Generating file...".to_string()));
        let Reply::Document {
            file_name,
            bytes,
            caption,
        } = &replies[1]
        else {
            panic!("expected document");
        };
        assert_eq!(file_name, "maintenance.txt");
        assert!(String::from_utf8_lossy(bytes).contains("1. USDT - TRX"));
        assert!(caption.contains("📤 Withdraw: 1 | 📥 Deposit: 1"));
    }

    #[test]
    fn test_export_json_saves_first() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handler(&dir).handle(Command::ExportJson);
        let Reply::Document {
            file_name, bytes, ..
        } = &replies[0]
        else {
            panic!("expected document");
        };
        assert_eq!(file_name, "state.json");
        assert!(dir.path().join("state.json").exists());
        let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert!(json["withdraw"].is_array());
    }

    #[test]
    fn test_reset_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir);
        handler.handle(Command::Reset);
        assert_eq!(handler.facade.summary().total_pairs, 0);
    }
}
