//! Snapshot source for the full currency status list.
//!
//! `CurrencyClient` fetches `GET {rest_url}/spot/currencies`; `fetch_with_retry`
//! wraps any [`SnapshotSource`] with a bounded, fixed-delay retry.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{CurrencyClient, SnapshotSource};
pub use error::{RegistryError, RegistryResult};
pub use retry::{fetch_with_retry, RetryPolicy};

use std::future::Future;
use std::pin::Pin;

/// Boxed future type for trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
