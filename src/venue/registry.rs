//! Venue registry: adapter ownership, permission gating, fault boundary.
//!
//! Every gated passthrough applies the same gate order: the adapter must
//! exist, then the configured permission level must cover the operation.
//! A failed gate or a failed adapter call is logged and converted to a
//! neutral value, so strategies observe venue faults as "no data this tick"
//! rather than errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::{PermissionLevel, VenueConfig};
use crate::domain::{Balances, Market, Order, OrderRequest, Symbol, Ticker, Trade, Withdrawal};

use super::{AdapterFactory, VenueAdapter};

#[derive(Default)]
pub struct VenueRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn VenueAdapter>>>,
    configs: RwLock<HashMap<String, VenueConfig>>,
    /// Reserved for future request pacing across callers.
    last_rate_limit_reset: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue, replacing any existing adapter under the same key.
    ///
    /// Fails (with a log line) when no adapter implementation exists for
    /// `config.venue_id`.
    pub fn add(&self, config: VenueConfig) -> bool {
        let adapter = match AdapterFactory::create(&config) {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(venue = %config.venue_id, error = %e, "Failed to add venue");
                return false;
            }
        };
        self.install(config, adapter)
    }

    /// Register a venue with a pre-built adapter.
    ///
    /// Callers bringing their own implementation (custom venues, test
    /// doubles) bypass the factory but get the same gating.
    pub fn add_with_adapter(&self, config: VenueConfig, adapter: Arc<dyn VenueAdapter>) -> bool {
        self.install(config, adapter)
    }

    fn install(&self, config: VenueConfig, adapter: Arc<dyn VenueAdapter>) -> bool {
        let venue_id = config.venue_id.clone();
        let display_name = config.display_name.clone();

        self.adapters.write().insert(venue_id.clone(), adapter);
        self.configs.write().insert(venue_id.clone(), config);
        self.last_rate_limit_reset
            .write()
            .insert(venue_id.clone(), Utc::now());

        info!(venue = %venue_id, name = %display_name, "Added venue");
        true
    }

    /// Deregister a venue. Idempotent; returns whether an entry existed.
    pub fn remove(&self, venue_id: &str) -> bool {
        let existed = self.adapters.write().remove(venue_id).is_some();
        self.configs.write().remove(venue_id);
        self.last_rate_limit_reset.write().remove(venue_id);

        if existed {
            info!(venue = %venue_id, "Removed venue");
        }
        existed
    }

    pub fn get(&self, venue_id: &str) -> Option<Arc<dyn VenueAdapter>> {
        self.adapters.read().get(venue_id).cloned()
    }

    pub fn config(&self, venue_id: &str) -> Option<VenueConfig> {
        self.configs.read().get(venue_id).cloned()
    }

    /// Registered venue ids.
    pub fn venue_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Venue ids an adapter implementation exists for.
    pub fn supported_venues(&self) -> Vec<&'static str> {
        AdapterFactory::supported_venues()
    }

    /// Whether the venue's configured permission level covers `required`.
    ///
    /// Uses the total order `read_only < read_write < read_write_withdraw`;
    /// absent venues fail the check.
    pub fn check_permission(&self, venue_id: &str, required: PermissionLevel) -> bool {
        self.configs
            .read()
            .get(venue_id)
            .map(|c| c.permission_level >= required)
            .unwrap_or(false)
    }

    /// Gate order: adapter exists, then permission.
    fn gated(&self, venue_id: &str, required: PermissionLevel) -> Option<Arc<dyn VenueAdapter>> {
        let Some(adapter) = self.get(venue_id) else {
            error!(venue = %venue_id, "Venue not found");
            return None;
        };
        if !self.check_permission(venue_id, required) {
            error!(
                venue = %venue_id,
                required = %required,
                "Venue does not have required permission"
            );
            return None;
        }
        Some(adapter)
    }

    pub async fn fetch_balance(&self, venue_id: &str) -> Balances {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadOnly) else {
            return Balances::new();
        };
        match adapter.fetch_balance().await {
            Ok(balances) => balances,
            Err(e) => {
                error!(venue = %venue_id, error = %e, "Failed to fetch balance");
                Balances::new()
            }
        }
    }

    pub async fn fetch_markets(&self, venue_id: &str) -> Vec<Market> {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadOnly) else {
            return Vec::new();
        };
        match adapter.fetch_markets().await {
            Ok(markets) => markets,
            Err(e) => {
                error!(venue = %venue_id, error = %e, "Failed to fetch markets");
                Vec::new()
            }
        }
    }

    pub async fn fetch_ticker(&self, venue_id: &str, symbol: &Symbol) -> Option<Ticker> {
        let adapter = self.gated(venue_id, PermissionLevel::ReadOnly)?;
        match adapter.fetch_ticker(symbol).await {
            Ok(ticker) => Some(ticker),
            Err(e) => {
                error!(venue = %venue_id, %symbol, error = %e, "Failed to fetch ticker");
                None
            }
        }
    }

    pub async fn create_order(&self, venue_id: &str, request: &OrderRequest) -> Option<Order> {
        let adapter = self.gated(venue_id, PermissionLevel::ReadWrite)?;
        match adapter.create_order(request).await {
            Ok(order) => Some(order),
            Err(e) => {
                error!(
                    venue = %venue_id,
                    symbol = %request.symbol,
                    side = %request.side,
                    error = %e,
                    "Failed to create order"
                );
                None
            }
        }
    }

    pub async fn cancel_order(
        &self,
        venue_id: &str,
        order_id: &str,
        symbol: Option<&Symbol>,
    ) -> bool {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadWrite) else {
            return false;
        };
        match adapter.cancel_order(order_id, symbol).await {
            Ok(()) => true,
            Err(e) => {
                error!(venue = %venue_id, order = %order_id, error = %e, "Failed to cancel order");
                false
            }
        }
    }

    pub async fn fetch_order(
        &self,
        venue_id: &str,
        order_id: &str,
        symbol: Option<&Symbol>,
    ) -> Option<Order> {
        let adapter = self.gated(venue_id, PermissionLevel::ReadOnly)?;
        match adapter.fetch_order(order_id, symbol).await {
            Ok(order) => Some(order),
            Err(e) => {
                error!(venue = %venue_id, order = %order_id, error = %e, "Failed to fetch order");
                None
            }
        }
    }

    pub async fn fetch_open_orders(&self, venue_id: &str, symbol: Option<&Symbol>) -> Vec<Order> {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadOnly) else {
            return Vec::new();
        };
        match adapter.fetch_open_orders(symbol).await {
            Ok(orders) => orders,
            Err(e) => {
                error!(venue = %venue_id, error = %e, "Failed to fetch open orders");
                Vec::new()
            }
        }
    }

    pub async fn fetch_closed_orders(&self, venue_id: &str, symbol: Option<&Symbol>) -> Vec<Order> {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadOnly) else {
            return Vec::new();
        };
        match adapter.fetch_closed_orders(symbol).await {
            Ok(orders) => orders,
            Err(e) => {
                error!(venue = %venue_id, error = %e, "Failed to fetch closed orders");
                Vec::new()
            }
        }
    }

    pub async fn fetch_my_trades(&self, venue_id: &str, symbol: Option<&Symbol>) -> Vec<Trade> {
        let Some(adapter) = self.gated(venue_id, PermissionLevel::ReadOnly) else {
            return Vec::new();
        };
        match adapter.fetch_my_trades(symbol).await {
            Ok(trades) => trades,
            Err(e) => {
                error!(venue = %venue_id, error = %e, "Failed to fetch trades");
                Vec::new()
            }
        }
    }

    pub async fn withdraw(
        &self,
        venue_id: &str,
        currency: &str,
        amount: Decimal,
        address: &str,
        tag: Option<&str>,
    ) -> Option<Withdrawal> {
        let adapter = self.gated(venue_id, PermissionLevel::ReadWriteWithdraw)?;
        match adapter.withdraw(currency, amount, address, tag).await {
            Ok(withdrawal) => Some(withdrawal),
            Err(e) => {
                error!(venue = %venue_id, %currency, error = %e, "Failed to withdraw");
                None
            }
        }
    }

    /// Probe connectivity by loading the venue's market list.
    pub async fn test_connection(&self, venue_id: &str) -> bool {
        let Some(adapter) = self.get(venue_id) else {
            error!(venue = %venue_id, "Venue not found");
            return false;
        };
        match adapter.test_connection().await {
            Ok(()) => {
                info!(venue = %venue_id, "Connection successful");
                true
            }
            Err(e) => {
                warn!(venue = %venue_id, error = %e, "Connection failed");
                false
            }
        }
    }
}
