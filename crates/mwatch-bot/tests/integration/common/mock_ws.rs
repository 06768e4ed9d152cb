//! Mock exchange WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections
//! - Acknowledge subscriptions and answer application pings
//! - Record received messages
//! - Push frames to, or close, every open connection

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum ServerCmd {
    Push(String),
    Close,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    cmd_tx: broadcast::Sender<ServerCmd>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (cmd_tx, _) = broadcast::channel::<ServerCmd>(64);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let cmd_tx_clone = cmd_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let messages = messages_clone.clone();
                        let connections = connections_clone.clone();
                        let cmd_rx = cmd_tx_clone.subscribe();
                        tokio::spawn(handle_connection(stream, messages, connections, cmd_rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            cmd_tx,
            messages,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Send a raw text frame to every open connection.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.cmd_tx.send(ServerCmd::Push(text.into()));
    }

    /// Push a `spot.currency_status` update.
    pub fn push_currency_update(&self, result: serde_json::Value) {
        let frame = serde_json::json!({
            "time": 1_700_000_000,
            "channel": "spot.currency_status",
            "event": "update",
            "result": result,
        });
        self.push(frame.to_string());
    }

    /// Close every open connection from the server side.
    pub fn close_all(&self) {
        let _ = self.cmd_tx.send(ServerCmd::Close);
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    mut cmd_rx: broadcast::Receiver<ServerCmd>,
) {
    // Increment connection count
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        {
                            let mut msgs = messages.lock().await;
                            msgs.push_back(text.clone());
                        }
                        if let Some(reply) = reply_to(&text) {
                            let _ = write.send(Message::Text(reply)).await;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Ok(ServerCmd::Push(text)) => {
                        let _ = write.send(Message::Text(text)).await;
                    }
                    Ok(ServerCmd::Close) | Err(_) => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }
}

/// Subscription acks and pongs, in the exchange's envelope.
fn reply_to(text: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
    let channel = parsed.get("channel")?.as_str()?;
    if channel == "spot.ping" {
        return Some(serde_json::json!({ "time": 1_700_000_000, "channel": "spot.pong" }).to_string());
    }
    if parsed.get("event").and_then(|e| e.as_str()) == Some("subscribe") {
        return Some(
            serde_json::json!({
                "time": 1_700_000_000,
                "channel": channel,
                "event": "subscribe",
                "result": { "status": "success" },
            })
            .to_string(),
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }

    #[test]
    fn test_reply_to_ping_and_subscribe() {
        let pong = reply_to(r#"{"time":1,"channel":"spot.ping"}"#).unwrap();
        assert!(pong.contains("spot.pong"));
        let ack = reply_to(r#"{"time":1,"channel":"spot.currency_status","event":"subscribe"}"#)
            .unwrap();
        assert!(ack.contains("\"event\":\"subscribe\""));
        assert!(reply_to("not json").is_none());
    }
}
