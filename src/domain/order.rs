//! Orders and order requests as venues report them.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Symbol;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order execution type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Market => "market",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable projection of an order's venue-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
}

impl OrderStatus {
    /// Normalize the status strings venues actually send.
    ///
    /// Anything unrecognized maps to `Open`, matching the permissive
    /// parsing of unified exchange libraries.
    pub fn from_venue_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "closed" | "filled" | "done" => Self::Closed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Open,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// An order as reported by a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub venue_id: String,
    pub symbol: Option<Symbol>,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled: Decimal,
    pub remaining: Decimal,
    /// Quote-currency total, when the venue reports it.
    pub cost: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// A request to place an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

impl OrderRequest {
    pub fn limit(symbol: Symbol, side: OrderSide, amount: Decimal, price: Decimal) -> Self {
        Self {
            symbol,
            side,
            kind: OrderKind::Limit,
            amount,
            price: Some(price),
        }
    }
}

/// A withdrawal acknowledged by a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Option<String>,
    pub currency: String,
    pub amount: Decimal,
    pub address: String,
}
