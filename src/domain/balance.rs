//! Account balance snapshot.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Funds held in one currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub free: Decimal,
    pub used: Decimal,
    pub total: Decimal,
}

/// Balance per currency code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<String, Balance>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, currency: impl Into<String>, balance: Balance) {
        self.0.insert(currency.into(), balance);
    }

    pub fn get(&self, currency: &str) -> Option<&Balance> {
        self.0.get(currency)
    }

    /// Freely available funds in `currency`, zero when the currency is
    /// absent.
    pub fn free(&self, currency: &str) -> Decimal {
        self.0.get(currency).map(|b| b.free).unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Balance)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_free_defaults_to_zero() {
        let mut balances = Balances::new();
        balances.insert(
            "BTC",
            Balance {
                free: dec!(1.5),
                used: dec!(0.5),
                total: dec!(2),
            },
        );

        assert_eq!(balances.free("BTC"), dec!(1.5));
        assert_eq!(balances.free("ETH"), Decimal::ZERO);
    }
}
