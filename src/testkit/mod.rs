//! Shared test utilities for integration tests.
//!
//! Enabled via the `testkit` feature; the crate's own dev-dependency on
//! itself turns it on for everything under `tests/`.

mod venue;

pub use venue::MockVenue;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::config::{PermissionLevel, VenueConfig};
use crate::domain::{Symbol, Ticker};

/// A venue config for tests, keyed by `venue_id` with the given permission.
pub fn venue_config(venue_id: &str, permission_level: PermissionLevel) -> VenueConfig {
    VenueConfig {
        permission_level,
        ..VenueConfig::stub(venue_id, venue_id)
    }
}

/// A well-formed ticker with the given top of book.
pub fn ticker(symbol: &Symbol, bid: Decimal, ask: Decimal, last: Decimal) -> Ticker {
    Ticker {
        symbol: symbol.clone(),
        bid: Some(bid),
        ask: Some(ask),
        last: Some(last),
        high: None,
        low: None,
        base_volume: None,
        timestamp: Utc::now(),
    }
}
