//! Queue between the reconciler and the notification sink.
//!
//! Enqueueing never blocks. The reconciler hands over rendered text after
//! it has released the state lock; the dispatcher task delivers messages
//! one at a time in enqueue order.

use crate::error::{NotifyError, NotifyResult};
use crate::format::MessageFormatter;
use crate::sink::NotificationSink;
use mwatch_core::Transition;
use mwatch_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cloneable enqueue handle.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
    formatter: MessageFormatter,
}

impl Notifier {
    /// Enqueue one message. A full queue drops it.
    pub fn notify(&self, text: String) -> NotifyResult<()> {
        match self.tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full, dropping message");
                Metrics::notify("dropped");
                Err(NotifyError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification queue closed, dropping message");
                Metrics::notify("dropped");
                Err(NotifyError::QueueClosed)
            }
        }
    }

    /// Render and enqueue every transition. Returns how many were queued.
    pub fn notify_transitions(&self, transitions: &[Transition]) -> usize {
        transitions
            .iter()
            .filter(|t| self.notify(self.formatter.transition(t)).is_ok())
            .count()
    }
}

/// Owns the sink and drains the queue.
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<String>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        formatter: MessageFormatter,
        capacity: usize,
    ) -> (Self, Notifier) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { rx, sink }, Notifier { tx, formatter })
    }

    /// Spawn the drain loop. It ends once every `Notifier` is dropped and
    /// the queue is empty.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(sink = self.sink.name(), "Notification dispatcher started");
        while let Some(text) = self.rx.recv().await {
            match self.sink.deliver(text).await {
                Ok(()) => {
                    Metrics::notify("sent");
                    debug!(sink = self.sink.name(), "Notification delivered");
                }
                Err(e) => {
                    Metrics::notify("failed");
                    warn!(sink = self.sink.name(), error = %e, "Notification delivery failed");
                }
            }
        }
        info!("Notification dispatcher stopped");
    }
}
