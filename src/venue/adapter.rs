//! The uniform venue operation surface.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Balances, Market, Order, OrderRequest, Symbol, Ticker, Trade, Withdrawal};
use crate::error::Result;

/// A live handle to one exchange venue.
///
/// Implementations wrap a single venue API. Return shapes are normalized
/// domain types; fields the venue does not report come back as `None`.
/// Operations a venue cannot perform return an error, which the registry
/// converts to a neutral value at its fault boundary.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Stable short key, e.g. `"kraken"`.
    fn venue_id(&self) -> &str;

    async fn fetch_balance(&self) -> Result<Balances>;

    async fn fetch_markets(&self) -> Result<Vec<Market>>;

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker>;

    async fn create_order(&self, request: &OrderRequest) -> Result<Order>;

    async fn cancel_order(&self, order_id: &str, symbol: Option<&Symbol>) -> Result<()>;

    async fn fetch_order(&self, order_id: &str, symbol: Option<&Symbol>) -> Result<Order>;

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>>;

    async fn fetch_closed_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>>;

    async fn fetch_my_trades(&self, symbol: Option<&Symbol>) -> Result<Vec<Trade>>;

    async fn withdraw(
        &self,
        currency: &str,
        amount: Decimal,
        address: &str,
        tag: Option<&str>,
    ) -> Result<Withdrawal>;

    /// Cheap connectivity probe, typically a market-list fetch.
    async fn test_connection(&self) -> Result<()>;
}
