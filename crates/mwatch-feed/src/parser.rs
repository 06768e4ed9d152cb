//! Payload parsing.
//!
//! Both sources carry the same per-currency object:
//! `{"currency": "USDT", "chains": [{"name": "TRX", "withdraw_disabled": false,
//! "deposit_disabled": true, ...}]}`. Unknown fields are ignored. A currency
//! without a name, or a chain without a name, is dropped. A missing flag is
//! read as `false`.

use crate::error::{FeedError, FeedResult};
use mwatch_core::{ChainStatus, IncrementalEvent, SnapshotEntry};
use mwatch_telemetry::Metrics;
use mwatch_ws::WsMessage;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Raw currency object as sent by the exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrency {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub chains: Option<Vec<RawChain>>,
}

/// Raw chain object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChain {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub withdraw_disabled: Option<bool>,
    #[serde(default)]
    pub deposit_disabled: Option<bool>,
}

/// Parsed items plus the number of entries dropped as malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

/// Running parse counters, shared by the snapshot and stream paths.
#[derive(Debug, Default)]
pub struct ParseStats {
    parsed: AtomicU64,
    skipped: AtomicU64,
}

impl ParseStats {
    pub fn record<T>(&self, parsed: &Parsed<T>) {
        self.parsed
            .fetch_add(parsed.items.len() as u64, Ordering::Relaxed);
        self.skipped.fetch_add(parsed.skipped as u64, Ordering::Relaxed);
    }

    pub fn parsed(&self) -> u64 {
        self.parsed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Normalize one raw currency. Returns `None` if the currency itself is
/// unusable; dropped chains are added to `skipped`.
fn normalize(raw: RawCurrency, source: &str, skipped: &mut usize) -> Option<(String, Vec<ChainStatus>)> {
    let Some(currency) = non_empty(raw.currency) else {
        warn!(source, "Dropping currency entry without name");
        Metrics::malformed_skipped(source);
        *skipped += 1;
        return None;
    };

    let raw_chains = raw.chains.unwrap_or_default();
    let mut chains = Vec::with_capacity(raw_chains.len());
    for chain in raw_chains {
        let Some(name) = non_empty(chain.name) else {
            warn!(source, %currency, "Dropping chain entry without name");
            Metrics::malformed_skipped(source);
            *skipped += 1;
            continue;
        };
        chains.push(ChainStatus::new(
            name,
            chain.withdraw_disabled.unwrap_or(false),
            chain.deposit_disabled.unwrap_or(false),
        ));
    }

    Some((currency, chains))
}

/// Decode a list of currency objects element by element so one bad element
/// does not sink the rest.
fn decode_list(values: Vec<serde_json::Value>, source: &str, skipped: &mut usize) -> Vec<RawCurrency> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<RawCurrency>(value) {
            Ok(raw) => out.push(raw),
            Err(e) => {
                warn!(source, error = %e, "Dropping undecodable currency entry");
                Metrics::malformed_skipped(source);
                *skipped += 1;
            }
        }
    }
    out
}

/// Parse the REST `spot/currencies` response body.
pub fn parse_snapshot(body: &str) -> FeedResult<Parsed<SnapshotEntry>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    parse_snapshot_value(value)
}

/// Parse an already-decoded snapshot body. The top level must be an array.
pub fn parse_snapshot_value(value: serde_json::Value) -> FeedResult<Parsed<SnapshotEntry>> {
    let serde_json::Value::Array(values) = value else {
        return Err(FeedError::UnexpectedShape(
            "snapshot body is not an array".to_string(),
        ));
    };

    let mut skipped = 0;
    let items: Vec<SnapshotEntry> = decode_list(values, "snapshot", &mut skipped)
        .into_iter()
        .filter_map(|raw| normalize(raw, "snapshot", &mut skipped))
        .map(|(currency, chains)| SnapshotEntry::new(currency, chains))
        .collect();

    debug!(entries = items.len(), skipped, "Parsed snapshot");
    Ok(Parsed { items, skipped })
}

/// Parse a `spot.currency_status` update frame.
///
/// `result` is normally one currency object; an array of them is accepted
/// too. Frames for other channels are rejected.
pub fn parse_currency_update(msg: &WsMessage) -> FeedResult<Parsed<IncrementalEvent>> {
    if !msg.is_currency_status_update() {
        return Err(FeedError::WrongChannel(format!(
            "{}/{}",
            msg.channel, msg.event
        )));
    }

    let values = match &msg.result {
        serde_json::Value::Array(values) => values.clone(),
        serde_json::Value::Object(_) => vec![msg.result.clone()],
        other => {
            return Err(FeedError::UnexpectedShape(format!(
                "update result is {}",
                json_kind(other)
            )))
        }
    };

    let mut skipped = 0;
    let items = decode_list(values, "incremental", &mut skipped)
        .into_iter()
        .filter_map(|raw| normalize(raw, "incremental", &mut skipped))
        .map(|(currency, chains)| IncrementalEvent::new(currency, chains))
        .collect();

    Ok(Parsed { items, skipped })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
