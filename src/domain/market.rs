//! Listed market metadata.

use serde::{Deserialize, Serialize};

use super::Symbol;

/// A tradable market as listed by a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Venue-native market id, e.g. `BTC-USDT`.
    pub id: String,
    pub symbol: Symbol,
    pub base: String,
    pub quote: String,
    pub active: bool,
}

impl Market {
    pub fn new(id: impl Into<String>, symbol: Symbol) -> Self {
        Self {
            id: id.into(),
            base: symbol.base().to_string(),
            quote: symbol.quote().to_string(),
            symbol,
            active: true,
        }
    }
}
