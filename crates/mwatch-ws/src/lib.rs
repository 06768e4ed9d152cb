//! WebSocket subscriber for the exchange currency status channel.
//!
//! Provides:
//! - Reconnection forever with a fixed delay
//! - Channel subscription on every (re)connect
//! - Application-level heartbeat (`spot.ping` / `spot.pong`)
//! - Channel-based forwarding of update messages

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use heartbeat::{HeartbeatManager, HeartbeatStats};
pub use message::{WsErrorBody, WsMessage, WsRequest, CURRENCY_STATUS_CHANNEL};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the TLS crypto provider. Call before the first connection.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
