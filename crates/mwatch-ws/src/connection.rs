//! WebSocket connection manager.
//!
//! Handles connection lifecycle, reconnection after a fixed delay, and
//! re-subscription on every new connection. Update frames are forwarded to
//! the consumer over an mpsc channel; acks and pongs are handled here.

use crate::error::{WsError, WsResult};
use crate::heartbeat::{HeartbeatManager, HeartbeatStats};
use crate::message::{WsMessage, WsRequest, CURRENCY_STATUS_CHANNEL};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use mwatch_telemetry::Metrics;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Fixed delay between a disconnect and the next attempt.
    pub reconnect_delay_ms: u64,
    /// Silence after which a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    pub heartbeat_timeout_ms: u64,
    /// Channels subscribed on every connect.
    pub channels: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.gateio.ws/ws/v4/".to_string(),
            reconnect_delay_ms: 5000,
            heartbeat_interval_ms: 20000,
            heartbeat_timeout_ms: 10000,
            channels: vec![CURRENCY_STATUS_CHANNEL.to_string()],
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    heartbeat: HeartbeatManager,
    message_tx: mpsc::Sender<WsMessage>,
    /// Reconnects since process start.
    reconnect_count: AtomicU64,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, message_tx: mpsc::Sender<WsMessage>) -> Self {
        let heartbeat =
            HeartbeatManager::new(config.heartbeat_interval_ms, config.heartbeat_timeout_ms);
        Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
            heartbeat,
            message_tx,
            reconnect_count: AtomicU64::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat.stats()
    }

    /// Signal graceful shutdown. Both the message loop and the reconnect
    /// wait exit promptly.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state.is_connected() {
            Metrics::ws_connected();
        } else {
            Metrics::ws_disconnected();
        }
    }

    /// Connect and run until shutdown. Reconnects forever.
    pub async fn connect(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let reason = match self.try_connect().await {
                Ok(()) => {
                    info!("WebSocket connection closed");
                    "stream_end"
                }
                Err(e) => {
                    error!(error = %e, "WebSocket connection error");
                    e.reason()
                }
            };

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::Relaxed) + 1;
            Metrics::ws_reconnect(reason);
            self.set_state(ConnectionState::Reconnecting);

            let delay = Duration::from_millis(self.config.reconnect_delay_ms);
            warn!(attempt, reason, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay, exiting");
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Connected);
        info!("WebSocket connected");

        self.subscribe(&mut write).await?;
        self.heartbeat.reset();

        self.message_loop(&mut write, &mut read).await
    }

    async fn subscribe(&self, write: &mut WsWrite) -> WsResult<()> {
        for channel in &self.config.channels {
            let req = WsRequest::subscribe(channel.clone(), Utc::now().timestamp());
            write.send(Message::Text(serde_json::to_string(&req)?)).await?;
            info!(%channel, "Subscription sent");
        }
        Ok(())
    }

    async fn message_loop(&self, write: &mut WsWrite, read: &mut WsRead) -> WsResult<()> {
        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            self.heartbeat.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_message();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                () = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        return Err(WsError::HeartbeatTimeout);
                    }
                    if self.heartbeat.should_send_ping() {
                        let ping = WsRequest::ping(Utc::now().timestamp());
                        write.send(Message::Text(serde_json::to_string(&ping)?)).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str) -> WsResult<()> {
        self.heartbeat.record_message();

        let msg: WsMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping unparseable frame");
                return Ok(());
            }
        };

        if msg.is_pong() {
            self.heartbeat.record_pong();
            return Ok(());
        }

        if msg.is_subscribe_ack() {
            return match &msg.error {
                Some(err) => Err(WsError::SubscriptionRejected(format!(
                    "{}: {} ({})",
                    msg.channel, err.message, err.code
                ))),
                None => {
                    info!(channel = %msg.channel, "Subscription acknowledged");
                    Ok(())
                }
            };
        }

        if let Some(err) = &msg.error {
            warn!(channel = %msg.channel, code = err.code, message = %err.message, "Server error frame");
            return Ok(());
        }

        if !msg.is_update() {
            debug!(channel = %msg.channel, event = %msg.event, "Ignoring non-update frame");
            return Ok(());
        }

        if self.message_tx.send(msg).await.is_err() {
            warn!("Message receiver dropped");
        }

        Ok(())
    }
}
