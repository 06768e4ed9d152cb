//! Best-effort notification delivery.
//!
//! Transitions are rendered to HTML text and pushed onto a bounded queue
//! drained by one dispatcher task. A full queue drops the message; a failed
//! delivery is logged and never retried.

pub mod dispatcher;
pub mod error;
pub mod format;
pub mod sink;
pub mod telegram;

pub use dispatcher::{NotificationDispatcher, Notifier};
pub use error::{NotifyError, NotifyResult};
pub use format::{escape_html, MessageFormatter, StartupSummary};
pub use sink::{LogSink, NotificationSink, RecordingSink};
pub use telegram::{Chat, IncomingMessage, TelegramClient, Update};

use std::future::Future;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
