//! Top-of-book ticker summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Symbol;

/// Top-of-book summary for a symbol.
///
/// Venues omit fields freely; a well-formed ticker carries at least `bid`
/// and `ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub base_volume: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    /// Both sides of the book are quoted.
    pub fn has_both_sides(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }
}
