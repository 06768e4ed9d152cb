//! WebSocket lifecycle integration tests.
//!
//! Tests the connection lifecycle:
//! - Connection establishment
//! - Subscription handling
//! - Update forwarding
//! - Reconnection behavior

mod integration;
use integration::common::mock_ws::MockWsServer;

use mwatch_feed::parse_currency_update;
use mwatch_ws::{ConnectionConfig, ConnectionManager, ConnectionState, WsMessage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

fn start_manager(
    url: String,
) -> (Arc<ConnectionManager>, mpsc::Receiver<WsMessage>, JoinHandle<()>) {
    let config = ConnectionConfig {
        url,
        reconnect_delay_ms: 100,
        ..Default::default()
    };
    let (message_tx, message_rx) = mpsc::channel::<WsMessage>(100);
    let manager = Arc::new(ConnectionManager::new(config, message_tx));

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });
    (manager, message_rx, handle)
}

/// Wait until the server has seen `n` subscribe requests.
async fn wait_for_subscriptions(server: &MockWsServer, n: usize) {
    timeout(Duration::from_secs(3), async {
        loop {
            let subs = server
                .received_messages()
                .await
                .iter()
                .filter(|m| m.contains("\"event\":\"subscribe\""))
                .count();
            if subs >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("subscription not received in time");
}

/// Test that ConnectionManager connects and subscribes to the status channel.
#[tokio::test]
async fn test_ws_connects_and_subscribes() {
    let server = MockWsServer::start().await;
    let (manager, _rx, handle) = start_manager(server.url());

    wait_for_subscriptions(&server, 1).await;

    let messages = server.received_messages().await;
    let sub: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
    assert_eq!(sub["channel"], "spot.currency_status");
    assert_eq!(sub["event"], "subscribe");
    assert!(sub["time"].as_i64().unwrap() > 0);

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(server.connection_count().await, 1);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    server.shutdown().await;
}

/// Test that status updates reach the consumer and parse into events.
#[tokio::test]
async fn test_ws_forwards_currency_updates() {
    let server = MockWsServer::start().await;
    let (manager, mut rx, handle) = start_manager(server.url());
    wait_for_subscriptions(&server, 1).await;

    // Noise first: none of these may be forwarded.
    server.push("not json");
    server.push(json!({"channel": "spot.tickers", "event": "subscribe"}).to_string());
    server.push(
        json!({
            "channel": "spot.currency_status",
            "event": "update",
            "error": {"code": 1, "message": "oops"}
        })
        .to_string(),
    );
    server.push_currency_update(json!({
        "currency": "USDT",
        "chains": [{"name": "TRX", "withdraw_disabled": true, "deposit_disabled": false}]
    }));

    let msg = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("update not forwarded")
        .expect("channel closed");
    assert!(msg.is_currency_status_update());

    let parsed = parse_currency_update(&msg).unwrap();
    assert_eq!(parsed.items.len(), 1);
    assert_eq!(parsed.items[0].currency, "USDT");
    assert!(parsed.items[0].chains[0].withdraw_disabled);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    server.shutdown().await;
}

/// Test that a server-side close triggers a reconnect and a fresh subscribe.
#[tokio::test]
async fn test_ws_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let (manager, _rx, handle) = start_manager(server.url());
    wait_for_subscriptions(&server, 1).await;

    server.close_all();

    wait_for_subscriptions(&server, 2).await;
    assert!(server.connection_count().await >= 2);
    assert!(manager.reconnect_count() >= 1);

    manager.shutdown();
    let _ = timeout(Duration::from_secs(2), handle).await;
    server.shutdown().await;
}

/// Test that the reconnect loop keeps retrying an unreachable endpoint
/// until shutdown.
#[tokio::test]
async fn test_ws_retries_until_shutdown() {
    let (manager, _rx, handle) = start_manager("ws://127.0.0.1:1".to_string());

    let retried = timeout(Duration::from_secs(3), async {
        while manager.reconnect_count() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(retried.is_ok(), "Should keep reconnecting");
    assert!(!manager.state().is_connected());

    manager.shutdown();
    let stopped = timeout(Duration::from_secs(2), handle).await;
    assert!(stopped.is_ok(), "Shutdown should end the connect loop");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
