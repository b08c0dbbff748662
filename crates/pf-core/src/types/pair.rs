//! Canonical (base, quote) currency pairs.
//!
//! The string form (`BTC/USDT`) is the key used in every price map returned to
//! consumers and in the subscription set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FeedError;

/// Separators accepted when parsing a pair from text.
const SEPARATORS: &[char] = &['/', '-', '_'];

/// A canonical currency pair, e.g. `(BTC, USDT)`.
///
/// Both legs are stored upper-case. The display form keeps the separator so
/// that distinct pairs never share a key (`BTC/USDT` vs `BTCU/SDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self { base: base.to_uppercase(), quote: quote.to_uppercase() }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = FeedError;

    /// Parse `BTC/USDT`, `BTC-USDT` or `btc_usdt`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once(SEPARATORS)
            .ok_or_else(|| FeedError::Config(format!("currency pair '{s}' has no separator")))?;
        if base.is_empty() || quote.is_empty() || quote.contains(SEPARATORS) {
            return Err(FeedError::Config(format!("invalid currency pair '{s}'")));
        }
        Ok(Self::new(base, quote))
    }
}

impl Serialize for CurrencyPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CurrencyPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_separator() {
        assert_eq!(CurrencyPair::new("btc", "usdt").to_string(), "BTC/USDT");
    }

    #[test]
    fn display_is_injective_across_leg_boundaries() {
        let a = CurrencyPair::new("BTC", "USDT");
        let b = CurrencyPair::new("BTCU", "SDT");
        assert_ne!(a.to_string(), b.to_string());
        assert_eq!(a.to_string().parse::<CurrencyPair>().unwrap(), a);
        assert_eq!(b.to_string().parse::<CurrencyPair>().unwrap(), b);
    }

    #[test]
    fn parse_accepts_common_separators() {
        let expected = CurrencyPair::new("BTC", "USDT");
        assert_eq!("BTC/USDT".parse::<CurrencyPair>().unwrap(), expected);
        assert_eq!("btc-usdt".parse::<CurrencyPair>().unwrap(), expected);
        assert_eq!(" BTC_USDT ".parse::<CurrencyPair>().unwrap(), expected);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("BTCUSDT".parse::<CurrencyPair>().is_err());
        assert!("/USDT".parse::<CurrencyPair>().is_err());
        assert!("BTC-USDT-SWAP".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn serde_uses_slash_form() {
        let pair: CurrencyPair = serde_json::from_str(r#""eth/usdc""#).unwrap();
        assert_eq!(pair, CurrencyPair::new("ETH", "USDC"));
        assert_eq!(serde_json::to_string(&pair).unwrap(), r#""ETH/USDC""#);
    }
}
