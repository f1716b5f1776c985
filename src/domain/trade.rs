//! Executed trade records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderSide, Symbol};

/// A fill reported by a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub order_id: Option<String>,
    pub symbol: Option<Symbol>,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}
