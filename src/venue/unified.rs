//! Unified REST venue family.
//!
//! There is no maintained Rust equivalent of the big unified-exchange
//! libraries, so the generic side of the adapter family is a single client
//! parameterized by a static [`VenueDescriptor`] table. The covered venues
//! (XeggeX and its API-compatible siblings) share one REST shape: public
//! `GET /markets` and `GET /ticker/{market}`, private endpoints signed with
//! HMAC-SHA256 over `nonce + method + path + body`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::VenueConfig;
use crate::domain::{
    Balance, Balances, Market, Order, OrderKind, OrderRequest, OrderSide, OrderStatus, Symbol,
    Ticker, Trade, Withdrawal,
};
use crate::error::{Error, Result};

use super::VenueAdapter;

/// Static facts about one venue in the unified family.
#[derive(Debug, Clone, Copy)]
pub struct VenueDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub api_url: &'static str,
    pub sandbox_url: Option<&'static str>,
}

/// Venues served by the unified client.
pub const DESCRIPTORS: &[VenueDescriptor] = &[
    VenueDescriptor {
        id: "xeggex",
        display_name: "XeggeX",
        api_url: "https://api.xeggex.com/api/v2",
        sandbox_url: None,
    },
    VenueDescriptor {
        id: "nonkyc",
        display_name: "NonKYC",
        api_url: "https://api.nonkyc.io/api/v2",
        sandbox_url: None,
    },
];

pub fn descriptor(venue_id: &str) -> Option<&'static VenueDescriptor> {
    DESCRIPTORS.iter().find(|d| d.id == venue_id)
}

/// Minimum spacing between requests when no override is configured.
const DEFAULT_RATE_LIMIT_MS: u64 = 200;

pub struct UnifiedVenue {
    descriptor: &'static VenueDescriptor,
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    /// Venue-specific knobs merged into every mutating request body.
    extra: Map<String, Value>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl UnifiedVenue {
    pub fn new(descriptor: &'static VenueDescriptor, config: &VenueConfig) -> Self {
        let base_url = if config.test_mode {
            match descriptor.sandbox_url {
                Some(url) => url.to_string(),
                None => {
                    warn!(venue = descriptor.id, "Venue has no sandbox, test_mode ignored");
                    descriptor.api_url.to_string()
                }
            }
        } else {
            descriptor.api_url.to_string()
        };

        let min_interval = config
            .extra
            .get("rate_limit_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_RATE_LIMIT_MS));

        let mut extra = config.extra.clone();
        extra.remove("rate_limit_ms");

        Self {
            descriptor,
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            extra,
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Venue-native market id, e.g. `XMR_USDT`.
    fn market_id(symbol: &Symbol) -> String {
        format!("{}_{}", symbol.base(), symbol.quote())
    }

    /// Enforce the configured request spacing.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn sign(&self, nonce: &str, method: &str, path: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(nonce.as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.pace().await;
        let url = format!("{}{}", self.base_url, path);
        debug!(venue = self.descriptor.id, url = %url, "GET");

        let response = self.client.get(&url).send().await?;
        decode(self.descriptor.id, response).await
    }

    async fn get_signed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.pace().await;
        let url = format!("{}{}", self.base_url, path);
        let nonce = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&nonce, "GET", path, "");
        debug!(venue = self.descriptor.id, url = %url, "GET (signed)");

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-API-NONCE", &nonce)
            .header("X-API-SIGNATURE", &signature)
            .send()
            .await?;
        decode(self.descriptor.id, response).await
    }

    async fn post_signed<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.pace().await;

        // Merge venue-specific defaults the way unified libraries pass
        // per-call params through.
        let mut body = body;
        if let (Value::Object(map), false) = (&mut body, self.extra.is_empty()) {
            for (key, value) in &self.extra {
                map.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let url = format!("{}{}", self.base_url, path);
        let encoded = serde_json::to_string(&body)?;
        let nonce = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&nonce, "POST", path, &encoded);
        debug!(venue = self.descriptor.id, url = %url, "POST (signed)");

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-API-NONCE", &nonce)
            .header("X-API-SIGNATURE", &signature)
            .header("Content-Type", "application/json")
            .body(encoded)
            .send()
            .await?;
        decode(self.descriptor.id, response).await
    }
}

async fn decode<T: DeserializeOwned>(venue_id: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Venue(format!(
            "{} returned {}: {}",
            venue_id, status, body
        )));
    }
    Ok(response.json().await?)
}

#[derive(Debug, Deserialize)]
struct MarketDto {
    symbol: Option<String>,
    #[serde(rename = "isActive", default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TickerDto {
    bid: Option<Decimal>,
    ask: Option<Decimal>,
    last_price: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    base_volume: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct BalanceDto {
    asset: Option<String>,
    available: Option<Decimal>,
    held: Option<Decimal>,
    total: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct OrderDto {
    id: Option<String>,
    symbol: Option<String>,
    side: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
    #[serde(rename = "executedQuantity")]
    executed: Option<Decimal>,
    #[serde(rename = "remainQuantity")]
    remaining: Option<Decimal>,
    #[serde(rename = "totalCost")]
    cost: Option<Decimal>,
    status: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<i64>,
}

impl OrderDto {
    fn into_order(self, venue_id: &str) -> Order {
        let amount = self.quantity.unwrap_or(Decimal::ZERO);
        let filled = self.executed.unwrap_or(Decimal::ZERO);
        Order {
            id: self.id.unwrap_or_default(),
            venue_id: venue_id.to_string(),
            symbol: self.symbol.and_then(|s| s.parse().ok()),
            side: match self.side.as_deref() {
                Some("sell") => OrderSide::Sell,
                _ => OrderSide::Buy,
            },
            kind: match self.kind.as_deref() {
                Some("market") => OrderKind::Market,
                _ => OrderKind::Limit,
            },
            amount,
            price: self.price,
            status: self
                .status
                .as_deref()
                .map(OrderStatus::from_venue_str)
                .unwrap_or(OrderStatus::Open),
            filled,
            remaining: self.remaining.unwrap_or(amount - filled),
            cost: self.cost,
            timestamp: millis_to_utc(self.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TradeDto {
    id: Option<String>,
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    symbol: Option<String>,
    side: Option<String>,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
    #[serde(rename = "totalCost")]
    cost: Option<Decimal>,
    #[serde(rename = "createdAt")]
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WithdrawalDto {
    id: Option<String>,
}

fn millis_to_utc(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl VenueAdapter for UnifiedVenue {
    fn venue_id(&self) -> &str {
        self.descriptor.id
    }

    async fn fetch_balance(&self) -> Result<Balances> {
        let entries: Vec<BalanceDto> = self.get_signed("/balances").await?;
        let mut balances = Balances::new();

        for entry in entries {
            let Some(asset) = entry.asset else { continue };
            let free = entry.available.unwrap_or(Decimal::ZERO);
            let used = entry.held.unwrap_or(Decimal::ZERO);
            balances.insert(
                asset,
                Balance {
                    free,
                    used,
                    total: entry.total.unwrap_or(free + used),
                },
            );
        }

        Ok(balances)
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let entries: Vec<MarketDto> = self.get_public("/markets").await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let symbol: Symbol = entry.symbol?.parse().ok()?;
                let mut market = Market::new(Self::market_id(&symbol), symbol);
                market.active = entry.is_active;
                Some(market)
            })
            .collect())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker> {
        let dto: TickerDto = self
            .get_public(&format!("/ticker/{}", Self::market_id(symbol)))
            .await?;

        Ok(Ticker {
            symbol: symbol.clone(),
            bid: dto.bid,
            ask: dto.ask,
            last: dto.last_price,
            high: dto.high,
            low: dto.low,
            base_volume: dto.base_volume,
            timestamp: Utc::now(),
        })
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<Order> {
        let mut body = serde_json::json!({
            "symbol": request.symbol.to_string(),
            "side": request.side.as_str(),
            "type": request.kind.as_str(),
            "quantity": request.amount.to_string(),
        });
        if let Some(price) = request.price {
            body["price"] = Value::String(price.to_string());
        }

        let dto: OrderDto = self.post_signed("/createorder", body).await?;
        let mut order = dto.into_order(self.descriptor.id);
        if order.symbol.is_none() {
            order.symbol = Some(request.symbol.clone());
        }
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<()> {
        let _: Value = self
            .post_signed("/cancelorder", serde_json::json!({ "id": order_id }))
            .await?;
        Ok(())
    }

    async fn fetch_order(&self, order_id: &str, _symbol: Option<&Symbol>) -> Result<Order> {
        let dto: OrderDto = self.get_signed(&format!("/getorder/{}", order_id)).await?;
        Ok(dto.into_order(self.descriptor.id))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        self.fetch_orders_with_status("active", symbol).await
    }

    async fn fetch_closed_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>> {
        self.fetch_orders_with_status("filled", symbol).await
    }

    async fn fetch_my_trades(&self, symbol: Option<&Symbol>) -> Result<Vec<Trade>> {
        let path = match symbol {
            Some(s) => format!("/gettrades?symbol={}", Self::market_id(s)),
            None => "/gettrades".to_string(),
        };
        let entries: Vec<TradeDto> = self.get_signed(&path).await?;

        Ok(entries
            .into_iter()
            .map(|dto| Trade {
                id: dto.id.unwrap_or_default(),
                order_id: dto.order_id,
                symbol: dto.symbol.and_then(|s| s.parse().ok()),
                side: match dto.side.as_deref() {
                    Some("sell") => OrderSide::Sell,
                    _ => OrderSide::Buy,
                },
                amount: dto.quantity.unwrap_or(Decimal::ZERO),
                price: dto.price.unwrap_or(Decimal::ZERO),
                cost: dto.cost,
                timestamp: millis_to_utc(dto.created_at),
            })
            .collect())
    }

    async fn withdraw(
        &self,
        currency: &str,
        amount: Decimal,
        address: &str,
        tag: Option<&str>,
    ) -> Result<Withdrawal> {
        let mut body = serde_json::json!({
            "ticker": currency,
            "quantity": amount.to_string(),
            "address": address,
        });
        if let Some(tag) = tag {
            body["paymentId"] = Value::String(tag.to_string());
        }

        let dto: WithdrawalDto = self.post_signed("/withdraw", body).await?;
        Ok(Withdrawal {
            id: dto.id,
            currency: currency.to_string(),
            amount,
            address: address.to_string(),
        })
    }

    async fn test_connection(&self) -> Result<()> {
        self.fetch_markets().await.map(|_| ())
    }
}

impl UnifiedVenue {
    async fn fetch_orders_with_status(
        &self,
        status: &str,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<Order>> {
        let path = match symbol {
            Some(s) => format!("/getorders?status={}&symbol={}", status, Self::market_id(s)),
            None => format!("/getorders?status={}", status),
        };
        let entries: Vec<OrderDto> = self.get_signed(&path).await?;

        Ok(entries
            .into_iter()
            .map(|dto| dto.into_order(self.descriptor.id))
            .collect())
    }
}
