//! WebSocket message types.
//!
//! Every frame on the v4 spot API is a JSON envelope:
//! `{"time": <secs>, "channel": "...", "event": "...", "result": ...}`.

use serde::{Deserialize, Serialize};

/// Channel carrying per-currency withdraw/deposit status.
pub const CURRENCY_STATUS_CHANNEL: &str = "spot.currency_status";

const PING_CHANNEL: &str = "spot.ping";
const PONG_CHANNEL: &str = "spot.pong";

/// Outgoing request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WsRequest {
    pub time: i64,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<String>>,
}

impl WsRequest {
    /// Subscribe to `channel`. An empty payload subscribes to all currencies.
    pub fn subscribe(channel: impl Into<String>, time: i64) -> Self {
        Self {
            time,
            channel: channel.into(),
            event: Some("subscribe".to_string()),
            payload: None,
        }
    }

    /// Application-level ping.
    pub fn ping(time: i64) -> Self {
        Self {
            time,
            channel: PING_CHANNEL.to_string(),
            event: None,
            payload: None,
        }
    }
}

/// Error body attached to rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WsErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Incoming message envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsMessage {
    #[serde(default)]
    pub time: Option<i64>,
    pub channel: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<WsErrorBody>,
}

impl WsMessage {
    pub fn is_pong(&self) -> bool {
        self.channel == PONG_CHANNEL
    }

    /// Subscription acknowledgement (or rejection, see `error`).
    pub fn is_subscribe_ack(&self) -> bool {
        self.event == "subscribe"
    }

    /// Data push on `channel`.
    pub fn is_update(&self) -> bool {
        self.event == "update"
    }

    /// Whether this is a status update for the currency status channel.
    pub fn is_currency_status_update(&self) -> bool {
        self.channel == CURRENCY_STATUS_CHANNEL && self.is_update()
    }
}
