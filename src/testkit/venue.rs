//! Scriptable in-memory venue adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{
    Balance, Balances, Market, Order, OrderRequest, OrderStatus, Symbol, Ticker, Trade, Withdrawal,
};
use crate::error::{Error, Result};
use crate::venue::VenueAdapter;

#[derive(Default)]
struct MockState {
    tickers: HashMap<Symbol, Ticker>,
    balances: Balances,
    markets: Vec<Market>,
    orders: Vec<Order>,
    next_order_id: u64,
    fail_create: bool,
    fail_all: bool,
    created: Vec<OrderRequest>,
    cancel_requests: Vec<String>,
}

/// In-memory [`VenueAdapter`] with scriptable quotes, balances, fills and
/// failure injection. Records every order placement and cancel request.
pub struct MockVenue {
    venue_id: String,
    state: Mutex<MockState>,
}

impl MockVenue {
    pub fn new(venue_id: impl Into<String>) -> Self {
        Self {
            venue_id: venue_id.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn set_ticker(&self, ticker: Ticker) {
        self.state.lock().tickers.insert(ticker.symbol.clone(), ticker);
    }

    pub fn set_balance(&self, currency: &str, free: Decimal) {
        self.state.lock().balances.insert(
            currency,
            Balance {
                free,
                used: Decimal::ZERO,
                total: free,
            },
        );
    }

    pub fn set_markets(&self, symbols: &[Symbol]) {
        self.state.lock().markets = symbols
            .iter()
            .map(|s| Market::new(s.dashed(), s.clone()))
            .collect();
    }

    /// Make subsequent `create_order` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }

    /// Make every subsequent call fail.
    pub fn set_fail_all(&self, fail: bool) {
        self.state.lock().fail_all = fail;
    }

    /// Report an open order as fully filled.
    pub fn fill_order(&self, order_id: &str) {
        let mut state = self.state.lock();
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.status = OrderStatus::Closed;
            order.filled = order.amount;
            order.remaining = Decimal::ZERO;
            order.cost = order.price.map(|p| p * order.amount);
        }
    }

    /// Report an open order as canceled venue-side.
    pub fn mark_canceled(&self, order_id: &str) {
        let mut state = self.state.lock();
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.status = OrderStatus::Canceled;
        }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.clone()
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .cloned()
            .collect()
    }

    /// Every order request that reached this venue.
    pub fn created_requests(&self) -> Vec<OrderRequest> {
        self.state.lock().created.clone()
    }

    /// Every order id a cancel was requested for.
    pub fn cancel_requests(&self) -> Vec<String> {
        self.state.lock().cancel_requests.clone()
    }
}

#[async_trait]
impl VenueAdapter for MockVenue {
    fn venue_id(&self) -> &str {
        &self.venue_id
    }

    async fn fetch_balance(&self) -> Result<Balances> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated balance failure".to_string()));
        }
        Ok(state.balances.clone())
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated markets failure".to_string()));
        }
        Ok(state.markets.clone())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated ticker failure".to_string()));
        }
        state
            .tickers
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::Venue(format!("no ticker for {}", symbol)))
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let mut state = self.state.lock();
        state.created.push(request.clone());

        if state.fail_all || state.fail_create {
            return Err(Error::Venue("simulated order rejection".to_string()));
        }

        state.next_order_id += 1;
        let order = Order {
            id: format!("{}-{}", self.venue_id, state.next_order_id),
            venue_id: self.venue_id.clone(),
            symbol: Some(request.symbol.clone()),
            side: request.side,
            kind: request.kind,
            amount: request.amount,
            price: request.price,
            status: OrderStatus::Open,
            filled: Decimal::ZERO,
            remaining: request.amount,
            cost: None,
            timestamp: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<()> {
        let mut state = self.state.lock();
        state.cancel_requests.push(order_id.to_string());

        if state.fail_all {
            return Err(Error::Venue("simulated cancel failure".to_string()));
        }

        match state.orders.iter_mut().find(|o| o.id == order_id) {
            Some(order) => {
                order.status = OrderStatus::Canceled;
                Ok(())
            }
            None => Err(Error::Venue(format!("order {} not found", order_id))),
        }
    }

    async fn fetch_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<Order> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated order lookup failure".to_string()));
        }
        state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| Error::Venue(format!("order {} not found", order_id)))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated open-orders failure".to_string()));
        }
        Ok(state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .filter(|o| symbol.is_none() || o.symbol.as_ref() == symbol)
            .cloned()
            .collect())
    }

    async fn fetch_closed_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated closed-orders failure".to_string()));
        }
        Ok(state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Closed)
            .filter(|o| symbol.is_none() || o.symbol.as_ref() == symbol)
            .cloned()
            .collect())
    }

    async fn fetch_my_trades(&self, _symbol: Option<&Symbol>) -> Result<Vec<Trade>> {
        Ok(Vec::new())
    }

    async fn withdraw(
        &self,
        currency: &str,
        amount: Decimal,
        address: &str,
        _tag: Option<&str>,
    ) -> Result<Withdrawal> {
        let state = self.state.lock();
        if state.fail_all {
            return Err(Error::Venue("simulated withdrawal failure".to_string()));
        }
        Ok(Withdrawal {
            id: Some(format!("{}-w", self.venue_id)),
            currency: currency.to_string(),
            amount,
            address: address.to_string(),
        })
    }

    async fn test_connection(&self) -> Result<()> {
        if self.state.lock().fail_all {
            return Err(Error::Venue("simulated connection failure".to_string()));
        }
        Ok(())
    }
}
