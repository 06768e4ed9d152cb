//! On-disk schema.
//!
//! ```json
//! {
//!   "withdraw":       [{"currency": "USDT", "chain": "TRX", "value": true}],
//!   "deposit":        [{"currency": "USDT", "chain": "TRX", "value": false}],
//!   "withdraw_times": [{"currency": "USDT", "chain": "TRX", "value": "2024-05-01T03:00:00Z"}],
//!   "deposit_times":  [],
//!   "last_update":    "2024-05-01T03:00:00Z"
//! }
//! ```
//!
//! Older files keyed every map by a joined `"CURRENCY_CHAIN"` string and
//! stored times as `"%Y-%m-%d %H:%M:%S WIB"`. Both are still read.

use chrono::{DateTime, SecondsFormat, Utc};
use mwatch_core::{
    Aspect, AspectState, DisplayZone, PairKey, PairState, TrackedState,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// One pair-keyed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord<T> {
    pub currency: String,
    pub chain: String,
    pub value: T,
}

impl<T> PairRecord<T> {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.currency.clone(), self.chain.clone())
    }
}

/// Pair-keyed map, written as a record array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMap<T> {
    records: Vec<PairRecord<T>>,
    /// Set when the map was read from the legacy joined-key form.
    legacy: bool,
}

impl<T> Default for PairMap<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            legacy: false,
        }
    }
}

impl<T> PairMap<T> {
    pub fn from_records(records: Vec<PairRecord<T>>) -> Self {
        Self {
            records,
            legacy: false,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keyed view; a later record for the same pair wins.
    fn to_map(&self) -> BTreeMap<PairKey, &T> {
        self.records.iter().map(|r| (r.key(), &r.value)).collect()
    }
}

impl<T: Serialize> Serialize for PairMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PairMapRepr<T> {
    Records(Vec<PairRecord<T>>),
    Legacy(BTreeMap<String, T>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for PairMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PairMapRepr::<T>::deserialize(deserializer)? {
            PairMapRepr::Records(records) => Ok(Self::from_records(records)),
            PairMapRepr::Legacy(map) => {
                let mut records = Vec::with_capacity(map.len());
                for (joined, value) in map {
                    match PairKey::from_legacy(&joined) {
                        Ok(key) => records.push(PairRecord {
                            currency: key.currency,
                            chain: key.chain,
                            value,
                        }),
                        Err(e) => warn!(key = %joined, error = %e, "Dropping unreadable legacy key"),
                    }
                }
                Ok(Self {
                    records,
                    legacy: true,
                })
            }
        }
    }
}

/// Persisted form of [`TrackedState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub withdraw: PairMap<bool>,
    #[serde(default)]
    pub deposit: PairMap<bool>,
    #[serde(default, alias = "withdrawTimes")]
    pub withdraw_times: PairMap<String>,
    #[serde(default, alias = "depositTimes")]
    pub deposit_times: PairMap<String>,
    #[serde(default, alias = "lastUpdate")]
    pub last_update: Option<String>,
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC 3339 first, then the legacy display form. Legacy files were always
/// written in WIB, whatever the display zone is now.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| DisplayZone::wib().parse(raw).ok())
}

impl PersistedState {
    /// Whether any map was read in the legacy joined-key form.
    pub fn is_legacy(&self) -> bool {
        self.withdraw.is_legacy()
            || self.deposit.is_legacy()
            || self.withdraw_times.is_legacy()
            || self.deposit_times.is_legacy()
    }

    pub fn from_tracked(state: &TrackedState) -> Self {
        let mut out = Self::default();
        for (key, pair) in state.iter() {
            for aspect in Aspect::ALL {
                let aspect_state = pair.get(aspect);
                let (flags, times) = match aspect {
                    Aspect::Withdraw => (&mut out.withdraw, &mut out.withdraw_times),
                    Aspect::Deposit => (&mut out.deposit, &mut out.deposit_times),
                };
                flags.records.push(PairRecord {
                    currency: key.currency.clone(),
                    chain: key.chain.clone(),
                    value: aspect_state.is_disabled(),
                });
                if let Some(since) = aspect_state.since() {
                    times.records.push(PairRecord {
                        currency: key.currency.clone(),
                        chain: key.chain.clone(),
                        value: format_time(since),
                    });
                }
            }
        }
        out.last_update = state.last_update().map(format_time);
        out
    }

    /// Rebuild the tracked state.
    ///
    /// A pair listed in only one flag map is enabled on the other aspect.
    /// A disabled aspect with a missing or unreadable time gets
    /// `since = now`. Invalid keys are dropped.
    pub fn into_tracked(self, now: DateTime<Utc>) -> TrackedState {
        let withdraw = self.withdraw.to_map();
        let deposit = self.deposit.to_map();
        let withdraw_times = self.withdraw_times.to_map();
        let deposit_times = self.deposit_times.to_map();

        let keys: BTreeSet<&PairKey> = withdraw.keys().chain(deposit.keys()).collect();
        let mut pairs = BTreeMap::new();

        for key in keys {
            if !key.is_valid() {
                warn!(pair = ?key, "Dropping persisted pair with empty identifier");
                continue;
            }

            let mut pair = PairState::default();
            for (aspect, flags, times) in [
                (Aspect::Withdraw, &withdraw, &withdraw_times),
                (Aspect::Deposit, &deposit, &deposit_times),
            ] {
                let disabled = flags.get(key).is_some_and(|v| **v);
                if !disabled {
                    continue;
                }
                let since = match times.get(key) {
                    Some(raw) => parse_time(raw).unwrap_or_else(|| {
                        warn!(pair = %key, %aspect, time = %raw, "Unreadable since time, using load time");
                        now
                    }),
                    None => {
                        warn!(pair = %key, %aspect, "Missing since time, using load time");
                        now
                    }
                };
                pair.set(aspect, AspectState::Disabled { since });
            }
            pairs.insert(key.clone(), pair);
        }

        let last_update = self
            .last_update
            .as_deref()
            .and_then(|raw| parse_time(raw));

        TrackedState::from_parts(pairs, last_update)
    }
}
