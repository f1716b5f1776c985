//! Trading pair symbol in external `BASE/QUOTE` form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A trading pair, e.g. `BTC/USDT`.
///
/// The external form is `BASE/QUOTE`. Venues that use a different separator
/// translate at the adapter boundary (`dashed()` covers the common
/// `BASE-QUOTE` case).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Venue form used by dash-separated APIs, e.g. `BTC-USDT`.
    pub fn dashed(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    /// Parse the dash-separated venue form back into a symbol.
    pub fn from_dashed(s: &str) -> Result<Self, Error> {
        match s.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(Error::Symbol(s.to_string())),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(Error::Symbol(s.to_string())),
        }
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let symbol: Symbol = "BTC/USDT".parse().unwrap();
        assert_eq!(symbol.base(), "BTC");
        assert_eq!(symbol.quote(), "USDT");
        assert_eq!(symbol.to_string(), "BTC/USDT");
    }

    #[test]
    fn test_dashed_round_trip() {
        let symbol: Symbol = "XMR/BTC".parse().unwrap();
        assert_eq!(symbol.dashed(), "XMR-BTC");
        assert_eq!(Symbol::from_dashed("XMR-BTC").unwrap(), symbol);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("BTCUSDT".parse::<Symbol>().is_err());
        assert!("/USDT".parse::<Symbol>().is_err());
        assert!("BTC/".parse::<Symbol>().is_err());
        assert!(Symbol::from_dashed("BTCUSDT").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let symbol: Symbol = "BTC/USDT".parse().unwrap();
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"BTC/USDT\"");
        let back: Symbol = serde_json::from_str("\"BTC/USDT\"").unwrap();
        assert_eq!(back, symbol);
    }
}
