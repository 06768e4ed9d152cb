//! HTTP client for the currency status list.

use crate::error::{RegistryError, RegistryResult};
use crate::BoxFuture;
use mwatch_core::SnapshotEntry;
use mwatch_feed::{parse_snapshot_value, Parsed};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const CURRENCIES_PATH: &str = "spot/currencies";

/// Anything that can produce one full snapshot.
pub trait SnapshotSource: Send + Sync {
    fn fetch_snapshot(&self) -> BoxFuture<'_, RegistryResult<Parsed<SnapshotEntry>>>;
}

/// Client for the exchange's public currency endpoint.
pub struct CurrencyClient {
    client: Client,
    url: String,
}

impl CurrencyClient {
    /// # Arguments
    /// * `rest_url` - API base, e.g. `https://api.gateio.ws/api/v4`
    /// * `timeout` - per-request timeout
    pub fn new(rest_url: &str, timeout: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: currencies_url(rest_url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> RegistryResult<Parsed<SnapshotEntry>> {
        info!(url = %self.url, "Fetching currency snapshot");

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to read response: {e}")))?;

        let parsed = parse_snapshot_value(body)?;
        debug!(
            currencies = parsed.items.len(),
            skipped = parsed.skipped,
            "Currency snapshot received"
        );
        Ok(parsed)
    }
}

impl SnapshotSource for CurrencyClient {
    fn fetch_snapshot(&self) -> BoxFuture<'_, RegistryResult<Parsed<SnapshotEntry>>> {
        Box::pin(self.fetch())
    }
}

fn currencies_url(rest_url: &str) -> String {
    format!("{}/{}", rest_url.trim_end_matches('/'), CURRENCIES_PATH)
}
