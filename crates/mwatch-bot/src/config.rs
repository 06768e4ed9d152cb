//! Application configuration.

use crate::error::{AppError, AppResult};
use mwatch_core::DisplayZone;
use mwatch_dashboard::DashboardConfig;
use mwatch_registry::RetryPolicy;
use mwatch_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display zone for human-facing timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_zone_label() -> String {
    "WIB".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            zone_label: default_zone_label(),
        }
    }
}

impl DisplayConfig {
    pub fn zone(&self) -> AppResult<DisplayZone> {
        Ok(DisplayZone::new(self.utc_offset_hours, self.zone_label.clone())?)
    }
}

/// Snapshot fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Attempts before startup gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts (ms).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-request timeout (ms).
    #[serde(default = "default_snapshot_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_snapshot_timeout_ms() -> u64 {
    60_000
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_snapshot_timeout_ms(),
        }
    }
}

impl SnapshotConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// WebSocket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_heartbeat_interval_ms() -> u64 {
    20_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl WebSocketConfig {
    pub fn connection_config(&self, url: &str) -> ConnectionConfig {
        ConnectionConfig {
            url: url.to_string(),
            reconnect_delay_ms: self.reconnect_delay_ms,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
            ..ConnectionConfig::default()
        }
    }
}

/// State file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Periodic save interval, on top of saves after each change.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
}

fn default_state_file() -> String {
    "data/maintenance_state.json".to_string()
}

fn default_save_interval_secs() -> u64 {
    300
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            save_interval_secs: default_save_interval_secs(),
        }
    }
}

/// Chat bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Overridden by `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: String,
    /// Overridden by `TELEGRAM_CHAT_ID`.
    #[serde(default)]
    pub chat_id: String,
    /// Pause between `getUpdates` polls (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Lines per message for paged lists.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause between pages (ms).
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_page_size() -> usize {
    50
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl TelegramConfig {
    /// Enabled and both credentials present.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

/// Notification queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on the shutdown notification (ms).
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API base.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// WebSocket endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Default log directives, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Interval of the periodic status log line.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_rest_url() -> String {
    "https://api.gateio.ws/api/v4".to_string()
}

fn default_ws_url() -> String {
    "wss://api.gateio.ws/ws/v4/".to_string()
}

fn default_log_level() -> String {
    "info,mwatch_bot=debug,mwatch_reconcile=debug".to_string()
}

fn default_status_interval_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            ws_url: default_ws_url(),
            log_level: default_log_level(),
            status_interval_secs: default_status_interval_secs(),
            display: DisplayConfig::default(),
            snapshot: SnapshotConfig::default(),
            websocket: WebSocketConfig::default(),
            persistence: PersistenceConfig::default(),
            telegram: TelegramConfig::default(),
            dashboard: DashboardConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Credentials from the environment win over the file.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(token) = get("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID").filter(|v| !v.is_empty()) {
            self.telegram.chat_id = chat_id;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.rest_url.trim().is_empty() {
            return Err(AppError::Config("rest_url must not be empty".to_string()));
        }
        if self.ws_url.trim().is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        if self.persistence.state_file.trim().is_empty() {
            return Err(AppError::Config(
                "persistence.state_file must not be empty".to_string(),
            ));
        }
        if self.telegram.page_size == 0 {
            return Err(AppError::Config(
                "telegram.page_size must be positive".to_string(),
            ));
        }
        if self.persistence.save_interval_secs == 0 {
            return Err(AppError::Config(
                "persistence.save_interval_secs must be positive".to_string(),
            ));
        }
        if self.status_interval_secs == 0 {
            return Err(AppError::Config(
                "status_interval_secs must be positive".to_string(),
            ));
        }
        if self.telegram.enabled
            && self.telegram.request_timeout_ms <= crate::commands::LONG_POLL_SECS * 1000
        {
            return Err(AppError::Config(format!(
                "telegram.request_timeout_ms must exceed the {}s long-poll",
                crate::commands::LONG_POLL_SECS
            )));
        }
        self.display.zone()?;
        Ok(())
    }
}
