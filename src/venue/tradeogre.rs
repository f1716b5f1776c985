//! Bespoke TradeOgre adapter.
//!
//! TradeOgre is not covered by the unified venue family, so this adapter
//! speaks its REST API directly: public `GET /markets`, `/ticker/{market}`
//! and `/orders/{market}`, private `GET /account/{balances,orders,order/..}`
//! and `POST /account/{buy,sell,cancel}` behind HTTP Basic auth. Market ids
//! use the `BASE-QUOTE` form.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::VenueConfig;
use crate::domain::{
    Balance, Balances, Market, Order, OrderKind, OrderRequest, OrderSide, OrderStatus, Symbol,
    Ticker, Trade, Withdrawal,
};
use crate::error::{Error, Result};

use super::{decimal_or, VenueAdapter};

pub const VENUE_ID: &str = "tradeogre";

const API_URL: &str = "https://tradeogre.com/api/v1";

pub struct TradeOgre {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl TradeOgre {
    pub fn new(config: &VenueConfig) -> Self {
        Self::with_base_url(config, API_URL)
    }

    /// Bind against a non-default endpoint, e.g. a local stub in tests.
    pub fn with_base_url(config: &VenueConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    async fn get_public(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "TradeOgre GET");
        let response: Value = self.client.get(&url).send().await?.json().await?;
        check_success(&response)?;
        Ok(response)
    }

    async fn get_private(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "TradeOgre GET (private)");
        let response: Value = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?
            .json()
            .await?;
        check_success(&response)?;
        Ok(response)
    }

    async fn post_private(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "TradeOgre POST");
        let response: Value = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        check_success(&response)?;
        Ok(response)
    }
}

/// TradeOgre flags failures with `success: false` plus an `error` field.
fn check_success(response: &Value) -> Result<()> {
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        let message = response
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(Error::Venue(format!("tradeogre error: {}", message)));
    }
    Ok(())
}

fn parse_account_order(venue_id: &str, order_id: &str, entry: &Value) -> Order {
    let side = match entry.get("type").and_then(Value::as_str) {
        Some("sell") => OrderSide::Sell,
        _ => OrderSide::Buy,
    };
    let symbol = entry
        .get("market")
        .and_then(Value::as_str)
        .and_then(|m| Symbol::from_dashed(m).ok());
    let amount = decimal_or(entry, "quantity", Some(Decimal::ZERO)).unwrap_or(Decimal::ZERO);
    let filled = decimal_or(entry, "fulfilled", Some(Decimal::ZERO)).unwrap_or(Decimal::ZERO);
    let status = if amount > Decimal::ZERO && filled >= amount {
        OrderStatus::Closed
    } else {
        OrderStatus::Open
    };

    Order {
        id: order_id.to_string(),
        venue_id: venue_id.to_string(),
        symbol,
        side,
        kind: OrderKind::Limit,
        amount,
        price: decimal_or(entry, "price", None),
        status,
        filled,
        remaining: amount - filled,
        cost: None,
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl VenueAdapter for TradeOgre {
    fn venue_id(&self) -> &str {
        VENUE_ID
    }

    async fn fetch_balance(&self) -> Result<Balances> {
        let response = self.get_private("account/balances").await?;
        let mut balances = Balances::new();

        let entries = response
            .get("balances")
            .and_then(Value::as_object)
            .cloned()
            .or_else(|| response.as_object().cloned())
            .unwrap_or_default();

        for (currency, entry) in &entries {
            if !entry.is_object() {
                continue;
            }
            balances.insert(
                currency.clone(),
                Balance {
                    free: decimal_or(entry, "available", Some(Decimal::ZERO))
                        .unwrap_or(Decimal::ZERO),
                    used: decimal_or(entry, "held", Some(Decimal::ZERO)).unwrap_or(Decimal::ZERO),
                    total: decimal_or(entry, "total", Some(Decimal::ZERO)).unwrap_or(Decimal::ZERO),
                },
            );
        }

        Ok(balances)
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let response = self.get_public("markets").await?;
        let mut markets = Vec::new();

        collect_markets(&response, &mut markets);

        Ok(markets)
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker> {
        let response = self
            .get_public(&format!("ticker/{}", symbol.dashed()))
            .await?;

        Ok(Ticker {
            symbol: symbol.clone(),
            bid: decimal_or(&response, "bid", None),
            ask: decimal_or(&response, "ask", None),
            last: decimal_or(&response, "price", None),
            high: decimal_or(&response, "high", None),
            low: decimal_or(&response, "low", None),
            base_volume: decimal_or(&response, "volume", None),
            timestamp: Utc::now(),
        })
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let price = request
            .price
            .ok_or_else(|| Error::Venue("tradeogre only supports limit orders".to_string()))?;

        let path = match request.side {
            OrderSide::Buy => "account/buy",
            OrderSide::Sell => "account/sell",
        };
        let body = json!({
            "market": request.symbol.dashed(),
            "quantity": request.amount.to_string(),
            "price": price.to_string(),
        });

        let response = self.post_private(path, body).await?;
        let id = response
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Venue("tradeogre response missing order uuid".to_string()))?;

        Ok(Order {
            id: id.to_string(),
            venue_id: VENUE_ID.to_string(),
            symbol: Some(request.symbol.clone()),
            side: request.side,
            kind: OrderKind::Limit,
            amount: request.amount,
            price: Some(price),
            status: OrderStatus::Open,
            filled: Decimal::ZERO,
            remaining: request.amount,
            cost: None,
            timestamp: Utc::now(),
        })
    }

    async fn cancel_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<()> {
        self.post_private("account/cancel", json!({ "uuid": order_id }))
            .await?;
        Ok(())
    }

    async fn fetch_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<Order> {
        let response = self
            .get_private(&format!("account/order/{}", order_id))
            .await?;
        Ok(parse_account_order(VENUE_ID, order_id, &response))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        let response = self.get_private("account/orders").await?;
        let mut orders = Vec::new();

        if let Some(entries) = response.as_object() {
            for (order_id, entry) in entries {
                if !entry.is_object() {
                    continue;
                }
                let order = parse_account_order(VENUE_ID, order_id, entry);
                if let Some(wanted) = symbol {
                    if order.symbol.as_ref() != Some(wanted) {
                        continue;
                    }
                }
                orders.push(order);
            }
        }

        Ok(orders)
    }

    async fn fetch_closed_orders(&self, _symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        Err(Error::Venue(
            "tradeogre does not support fetching closed orders".to_string(),
        ))
    }

    async fn fetch_my_trades(&self, _symbol: Option<&Symbol>) -> Result<Vec<Trade>> {
        Err(Error::Venue(
            "tradeogre does not support fetching trade history".to_string(),
        ))
    }

    async fn withdraw(
        &self,
        _currency: &str,
        _amount: Decimal,
        _address: &str,
        _tag: Option<&str>,
    ) -> Result<Withdrawal> {
        Err(Error::Venue(
            "tradeogre does not support withdrawals over the API".to_string(),
        ))
    }

    async fn test_connection(&self) -> Result<()> {
        self.fetch_markets().await.map(|_| ())
    }
}

/// `GET /markets` historically returned an object keyed by market id; newer
/// deployments wrap each entry in a single-key object inside an array.
/// Accept both.
fn collect_markets(response: &Value, markets: &mut Vec<Market>) {
    match response {
        Value::Object(entries) => {
            for market_id in entries.keys() {
                if let Ok(symbol) = Symbol::from_dashed(market_id) {
                    markets.push(Market::new(market_id.clone(), symbol));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_markets(item, markets);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_check_success_flags_error_payloads() {
        let err = check_success(&json!({"success": false, "error": "Insufficient funds"}));
        assert!(matches!(err, Err(Error::Venue(msg)) if msg.contains("Insufficient funds")));

        assert!(check_success(&json!({"success": true, "uuid": "abc"})).is_ok());
        assert!(check_success(&json!({"XMR-BTC": {}})).is_ok());
    }

    #[test]
    fn test_parse_account_order() {
        let entry = json!({
            "market": "XMR-BTC",
            "type": "sell",
            "price": "0.0042",
            "quantity": "10",
            "fulfilled": "10",
        });
        let order = parse_account_order(VENUE_ID, "uuid-1", &entry);

        assert_eq!(order.id, "uuid-1");
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.symbol, Some("XMR/BTC".parse().unwrap()));
        assert_eq!(order.price, Some(dec!(0.0042)));
        assert_eq!(order.status, OrderStatus::Closed);
        assert_eq!(order.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_parse_account_order_tolerates_garbage() {
        let entry = json!({"type": "buy", "price": null, "quantity": "oops"});
        let order = parse_account_order(VENUE_ID, "uuid-2", &entry);

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.amount, Decimal::ZERO);
        assert_eq!(order.price, None);
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[test]
    fn test_collect_markets_accepts_both_shapes() {
        let mut markets = Vec::new();
        collect_markets(&json!({"XMR-BTC": {}, "LTC-BTC": {}}), &mut markets);
        assert_eq!(markets.len(), 2);

        let mut markets = Vec::new();
        collect_markets(&json!([{"XMR-BTC": {}}, {"LTC-BTC": {}}]), &mut markets);
        assert_eq!(markets.len(), 2);
    }
}
