//! Delivery backends.

use crate::error::NotifyResult;
use crate::telegram::TelegramClient;
use crate::BoxFuture;
use parking_lot::Mutex;
use tracing::info;

/// Destination for rendered notification text.
pub trait NotificationSink: Send + Sync {
    /// Deliver one message. Failure is reported, never retried.
    fn deliver(&self, text: String) -> BoxFuture<'_, NotifyResult<()>>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

impl NotificationSink for TelegramClient {
    fn deliver(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async move { self.send_message(&text).await })
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Writes notifications to the log. Used when no chat is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async move {
            info!(message = %text, "Notification");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// In-memory sink for tests. Can be switched to fail every delivery.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async move {
            if *self.fail.lock() {
                return Err(crate::NotifyError::Api {
                    status: 500,
                    description: "recording sink set to fail".to_string(),
                });
            }
            self.delivered.lock().push(text);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
