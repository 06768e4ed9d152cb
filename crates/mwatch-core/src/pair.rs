//! Pair identifiers.
//!
//! A pair is a (currency, chain) combination. Both parts are kept as separate
//! fields: exchange identifiers can contain `_`, `-` or `:` themselves, so a
//! joined string would not split back unambiguously.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural (currency, chain) key.
///
/// Ordering is by currency first, then chain, which is the ordering every
/// report and listing uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    /// Currency symbol (e.g., "USDT").
    pub currency: String,
    /// Chain name as reported by the exchange (e.g., "TRX", "ETH").
    pub chain: String,
}

impl PairKey {
    /// Create a new pair key.
    pub fn new(currency: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            chain: chain.into(),
        }
    }

    /// Create a pair key, rejecting empty currency or chain names.
    pub fn try_new(currency: impl Into<String>, chain: impl Into<String>) -> Result<Self> {
        let key = Self::new(currency, chain);
        if key.is_valid() {
            Ok(key)
        } else {
            Err(CoreError::InvalidPairKey(format!(
                "currency={:?} chain={:?}",
                key.currency, key.chain
            )))
        }
    }

    /// Both parts must be non-empty.
    pub fn is_valid(&self) -> bool {
        !self.currency.trim().is_empty() && !self.chain.trim().is_empty()
    }

    /// Parse a legacy `CURRENCY_CHAIN` string by splitting on the last `_`.
    ///
    /// Only used to migrate old state files. Ambiguous for currencies or
    /// chains containing `_`; the last separator wins.
    pub fn from_legacy(joined: &str) -> Result<Self> {
        match joined.rsplit_once('_') {
            Some((currency, chain)) => Self::try_new(currency, chain),
            None => Err(CoreError::InvalidPairKey(joined.to_string())),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.currency, self.chain)
    }
}

/// One of the two independently tracked capabilities of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Withdraw,
    Deposit,
}

impl Aspect {
    /// Both aspects, in reporting order.
    pub const ALL: [Aspect; 2] = [Aspect::Withdraw, Aspect::Deposit];

    /// Lowercase identifier used in metrics labels and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdraw => "withdraw",
            Self::Deposit => "deposit",
        }
    }

    /// Capitalized label used in human-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Withdraw => "Withdraw",
            Self::Deposit => "Deposit",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Aspect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "withdraw" => Ok(Self::Withdraw),
            "deposit" => Ok(Self::Deposit),
            other => Err(CoreError::UnknownAspect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_ordering() {
        let mut keys = vec![
            PairKey::new("USDT", "TRX"),
            PairKey::new("BTC", "BTC"),
            PairKey::new("USDT", "ETH"),
        ];
        keys.sort();
        assert_eq!(keys[0], PairKey::new("BTC", "BTC"));
        assert_eq!(keys[1], PairKey::new("USDT", "ETH"));
        assert_eq!(keys[2], PairKey::new("USDT", "TRX"));
    }

    #[test]
    fn test_separator_in_names_stays_distinct() {
        // "A_B" + "C" and "A" + "B_C" collapse to the same joined string.
        let left = PairKey::new("A_B", "C");
        let right = PairKey::new("A", "B_C");
        assert_ne!(left, right);
    }

    #[test]
    fn test_try_new_rejects_empty() {
        assert!(PairKey::try_new("", "ETH").is_err());
        assert!(PairKey::try_new("USDT", "  ").is_err());
        assert!(PairKey::try_new("USDT", "ETH").is_ok());
    }

    #[test]
    fn test_from_legacy_splits_on_last_separator() {
        let key = PairKey::from_legacy("USDT_TRX").unwrap();
        assert_eq!(key, PairKey::new("USDT", "TRX"));

        let key = PairKey::from_legacy("WRAPPED_ETH_ARB").unwrap();
        assert_eq!(key, PairKey::new("WRAPPED_ETH", "ARB"));

        assert!(PairKey::from_legacy("NOSEPARATOR").is_err());
    }

    #[test]
    fn test_aspect_from_str() {
        assert_eq!("withdraw".parse::<Aspect>().unwrap(), Aspect::Withdraw);
        assert_eq!("Deposit".parse::<Aspect>().unwrap(), Aspect::Deposit);
        assert!("trade".parse::<Aspect>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(PairKey::new("USDT", "TRX").to_string(), "USDT - TRX");
        assert_eq!(Aspect::Deposit.to_string(), "deposit");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(PairKey::new("USDT", "TRX")).unwrap();
        assert_eq!(json, serde_json::json!({"currency": "USDT", "chain": "TRX"}));
        assert_eq!(
            serde_json::to_string(&Aspect::Withdraw).unwrap(),
            "\"withdraw\""
        );
    }
}
