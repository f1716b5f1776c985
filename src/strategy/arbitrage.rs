//! Cross-exchange arbitrage strategy.
//!
//! Buys on the venue quoting the lower ask and sells on the venue quoting
//! the higher bid, holding the paired legs until both settle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{OrderRequest, OrderSide, OrderStatus, Symbol};
use crate::error::{Error, Result};
use crate::venue::VenueRegistry;

use super::registry::StrategyDefinition;
use super::{ParamKind, ParamSpec, Parameters, Strategy, StrategyDescriptor, StrategyState};

pub const STRATEGY_ID: &str = "arbitrage";

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        id: STRATEGY_ID,
        name: "Cross-Exchange Arbitrage",
        description: "Exploits price differences between the same asset on different exchanges. \
                      Buys on the exchange with the lower price and sells on the exchange with \
                      the higher price. Requires at least two exchanges with the same trading \
                      pair.",
        parameters: vec![
            ParamSpec::required(
                "symbol",
                ParamKind::String,
                "Trading pair to arbitrage (e.g., BTC/USDT)",
            ),
            ParamSpec::required(
                "exchanges",
                ParamKind::StringList,
                "List of exchange IDs to use for arbitrage",
            )
            .with_min_length(2),
            ParamSpec::optional(
                "min_profit_percent",
                ParamKind::Decimal,
                "Minimum profit percentage to execute arbitrage",
                json!(1.0),
            )
            .with_min(0.1),
            ParamSpec::required(
                "max_order_size",
                ParamKind::Decimal,
                "Maximum order size in base currency",
            ),
            ParamSpec::optional(
                "tick_interval",
                ParamKind::Integer,
                "Interval between strategy updates in seconds",
                json!(10),
            )
            .with_min(1.0),
        ],
        required_exchanges: vec![],
        required_markets: vec![],
    }
}

pub fn definition() -> StrategyDefinition {
    StrategyDefinition {
        descriptor: descriptor(),
        build: |venues, parameters, state| {
            Ok(Box::new(ArbitrageStrategy::from_parameters(
                venues, parameters, state,
            )?))
        },
    }
}

/// Latest usable quote from one venue.
#[derive(Debug, Clone)]
pub struct VenueQuote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// A profitable price gap between two venues.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub symbol: Symbol,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub profit_pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArbStatus {
    Active,
    Completed,
    Failed,
    Cancelled,
}

/// A matched pair of opposite-side orders across two venues.
#[derive(Debug, Clone)]
struct Arbitrage {
    id: Uuid,
    buy_venue: String,
    sell_venue: String,
    buy_order_id: String,
    sell_order_id: String,
    amount: Decimal,
    target_buy_price: Decimal,
    target_sell_price: Decimal,
    status: ArbStatus,
    realized_profit: Option<Decimal>,
    realized_profit_pct: Option<Decimal>,
}

pub struct ArbitrageStrategy {
    venues: Arc<VenueRegistry>,
    state: Arc<StrategyState>,
    symbol: Symbol,
    venue_ids: Vec<String>,
    max_order_size: Decimal,
    min_profit_percent: Decimal,
    tick_interval: Duration,
    last_prices: HashMap<String, VenueQuote>,
    active_arbitrages: Vec<Arbitrage>,
}

impl ArbitrageStrategy {
    pub fn from_parameters(
        venues: Arc<VenueRegistry>,
        parameters: &Parameters,
        state: Arc<StrategyState>,
    ) -> Result<Self> {
        let symbol: Symbol = parameters.string("symbol")?.parse()?;
        let venue_ids = parameters.string_list("exchanges")?;
        if venue_ids.len() < 2 {
            return Err(Error::StrategyParams(
                "At least two exchanges are required for arbitrage".to_string(),
            ));
        }

        let max_order_size = parameters.decimal("max_order_size")?;
        let min_profit_percent = parameters.decimal_or("min_profit_percent", dec!(1.0))?;
        if min_profit_percent < dec!(0.1) {
            return Err(Error::StrategyParams(
                "min_profit_percent must be at least 0.1".to_string(),
            ));
        }

        let tick_interval = parameters.u64_or("tick_interval", 10)?.max(1);

        Ok(Self {
            venues,
            state,
            symbol,
            venue_ids,
            max_order_size,
            min_profit_percent,
            tick_interval: Duration::from_secs(tick_interval),
            last_prices: HashMap::new(),
            active_arbitrages: Vec::new(),
        })
    }

    async fn update_prices(&mut self) {
        for venue_id in &self.venue_ids {
            let Some(ticker) = self.venues.fetch_ticker(venue_id, &self.symbol).await else {
                continue;
            };
            let (Some(bid), Some(ask)) = (ticker.bid, ticker.ask) else {
                debug!(venue = %venue_id, "Ticker missing bid or ask, skipping");
                continue;
            };

            debug!(venue = %venue_id, %bid, %ask, "Updated quote");
            self.last_prices.insert(
                venue_id.clone(),
                VenueQuote {
                    bid,
                    ask,
                    last: ticker.last,
                    timestamp: Utc::now(),
                },
            );
        }
    }

    async fn execute(&mut self, opportunity: &Opportunity) {
        use crate::config::PermissionLevel;

        let buy_venue = &opportunity.buy_venue;
        let sell_venue = &opportunity.sell_venue;

        if !self
            .venues
            .check_permission(buy_venue, PermissionLevel::ReadWrite)
        {
            warn!(venue = %buy_venue, "No permission to trade, skipping opportunity");
            return;
        }
        if !self
            .venues
            .check_permission(sell_venue, PermissionLevel::ReadWrite)
        {
            warn!(venue = %sell_venue, "No permission to trade, skipping opportunity");
            return;
        }

        let buy_balance = self.venues.fetch_balance(buy_venue).await;
        let sell_balance = self.venues.fetch_balance(sell_venue).await;

        let quote_free = buy_balance.free(self.symbol.quote());
        let base_free = sell_balance.free(self.symbol.base());
        let max_buy_amount = quote_free / opportunity.buy_price;

        let order_size = self.max_order_size.min(max_buy_amount).min(base_free);
        if order_size <= Decimal::ZERO {
            warn!(
                buy_venue = %buy_venue,
                sell_venue = %sell_venue,
                "Insufficient balance for arbitrage"
            );
            return;
        }

        let buy_request = OrderRequest::limit(
            self.symbol.clone(),
            OrderSide::Buy,
            order_size,
            opportunity.buy_price,
        );
        let Some(buy_order) = self.venues.create_order(buy_venue, &buy_request).await else {
            warn!(venue = %buy_venue, "Failed to create buy order, skipping opportunity");
            return;
        };

        let sell_request = OrderRequest::limit(
            self.symbol.clone(),
            OrderSide::Sell,
            order_size,
            opportunity.sell_price,
        );
        let Some(sell_order) = self.venues.create_order(sell_venue, &sell_request).await else {
            // The buy leg is live; unwind it best-effort before giving up.
            warn!(venue = %sell_venue, "Failed to create sell order, cancelling buy leg");
            self.venues
                .cancel_order(buy_venue, &buy_order.id, Some(&self.symbol))
                .await;
            return;
        };

        let arbitrage = Arbitrage {
            id: Uuid::new_v4(),
            buy_venue: buy_venue.clone(),
            sell_venue: sell_venue.clone(),
            buy_order_id: buy_order.id,
            sell_order_id: sell_order.id,
            amount: order_size,
            target_buy_price: opportunity.buy_price,
            target_sell_price: opportunity.sell_price,
            status: ArbStatus::Active,
            realized_profit: None,
            realized_profit_pct: None,
        };
        info!(
            arb = %arbitrage.id,
            buy_venue = %arbitrage.buy_venue,
            sell_venue = %arbitrage.sell_venue,
            amount = %arbitrage.amount,
            profit_pct = %opportunity.profit_pct,
            "Executed arbitrage"
        );
        self.active_arbitrages.push(arbitrage);
    }

    async fn update_active_arbitrages(&mut self) {
        for arb in self.active_arbitrages.iter_mut() {
            if arb.status != ArbStatus::Active {
                continue;
            }

            let buy_order = self
                .venues
                .fetch_order(&arb.buy_venue, &arb.buy_order_id, Some(&self.symbol))
                .await;
            let sell_order = self
                .venues
                .fetch_order(&arb.sell_venue, &arb.sell_order_id, Some(&self.symbol))
                .await;
            let (Some(buy_order), Some(sell_order)) = (buy_order, sell_order) else {
                continue;
            };

            if buy_order.status == OrderStatus::Closed && sell_order.status == OrderStatus::Closed {
                arb.status = ArbStatus::Completed;

                let buy_cost = buy_order
                    .cost
                    .unwrap_or(arb.amount * arb.target_buy_price);
                let sell_cost = sell_order
                    .cost
                    .unwrap_or(arb.amount * arb.target_sell_price);
                let profit = sell_cost - buy_cost;
                let profit_pct = if buy_cost > Decimal::ZERO {
                    profit / buy_cost * dec!(100)
                } else {
                    Decimal::ZERO
                };

                arb.realized_profit = Some(profit);
                arb.realized_profit_pct = Some(profit_pct);

                info!(
                    arb = %arb.id,
                    profit = %profit,
                    profit_pct = %profit_pct,
                    "Arbitrage completed"
                );
                self.state.record_trade(profit, profit > Decimal::ZERO);
            } else if buy_order.status == OrderStatus::Canceled
                || sell_order.status == OrderStatus::Canceled
            {
                arb.status = ArbStatus::Failed;
                warn!(arb = %arb.id, "Arbitrage failed: order was cancelled");

                if buy_order.status != OrderStatus::Canceled {
                    self.venues
                        .cancel_order(&arb.buy_venue, &arb.buy_order_id, Some(&self.symbol))
                        .await;
                }
                if sell_order.status != OrderStatus::Canceled {
                    self.venues
                        .cancel_order(&arb.sell_venue, &arb.sell_order_id, Some(&self.symbol))
                        .await;
                }
            }
        }
    }

    fn log_status(&self) {
        let active = self.count_status(ArbStatus::Active);
        let completed = self.count_status(ArbStatus::Completed);
        let failed =
            self.count_status(ArbStatus::Failed) + self.count_status(ArbStatus::Cancelled);

        info!(active, completed, failed, "Arbitrage status");

        if completed > 0 {
            let total_profit: Decimal = self
                .active_arbitrages
                .iter()
                .filter_map(|a| a.realized_profit)
                .sum();
            let avg_profit_pct: Decimal = self
                .active_arbitrages
                .iter()
                .filter_map(|a| a.realized_profit_pct)
                .sum::<Decimal>()
                / Decimal::from(completed);

            info!(
                total_profit = %total_profit,
                avg_profit_pct = %avg_profit_pct,
                "Realized arbitrage profit"
            );
        }
    }

    fn count_status(&self, status: ArbStatus) -> usize {
        self.active_arbitrages
            .iter()
            .filter(|a| a.status == status)
            .count()
    }

    /// Number of arbitrages still in flight.
    pub fn active_count(&self) -> usize {
        self.count_status(ArbStatus::Active)
    }
}

/// Scan every ordered venue pair for a bid/ask gap above the threshold.
///
/// Pairs are iterated unordered and tested in both directions; a gap exists
/// when one venue's bid exceeds another's ask.
pub fn find_opportunities(
    symbol: &Symbol,
    venue_ids: &[String],
    quotes: &HashMap<String, VenueQuote>,
    min_profit_percent: Decimal,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();
    let hundred = dec!(100);

    for i in 0..venue_ids.len() {
        for j in (i + 1)..venue_ids.len() {
            let (first, second) = (&venue_ids[i], &venue_ids[j]);
            let (Some(q1), Some(q2)) = (quotes.get(first), quotes.get(second)) else {
                continue;
            };

            // Buy on `first`, sell on `second`
            if q2.bid > q1.ask && q1.ask > Decimal::ZERO {
                let profit_pct = (q2.bid / q1.ask - Decimal::ONE) * hundred;
                if profit_pct >= min_profit_percent {
                    opportunities.push(Opportunity {
                        symbol: symbol.clone(),
                        buy_venue: first.clone(),
                        sell_venue: second.clone(),
                        buy_price: q1.ask,
                        sell_price: q2.bid,
                        profit_pct,
                    });
                }
            }

            // Buy on `second`, sell on `first`
            if q1.bid > q2.ask && q2.ask > Decimal::ZERO {
                let profit_pct = (q1.bid / q2.ask - Decimal::ONE) * hundred;
                if profit_pct >= min_profit_percent {
                    opportunities.push(Opportunity {
                        symbol: symbol.clone(),
                        buy_venue: second.clone(),
                        sell_venue: first.clone(),
                        buy_price: q2.ask,
                        sell_price: q1.bid,
                        profit_pct,
                    });
                }
            }
        }
    }

    opportunities
}

#[async_trait]
impl Strategy for ArbitrageStrategy {
    async fn on_start(&mut self) -> Result<()> {
        info!(
            symbol = %self.symbol,
            venues = ?self.venue_ids,
            "Starting arbitrage strategy"
        );

        for venue_id in &self.venue_ids {
            let markets = self.venues.fetch_markets(venue_id).await;
            if !markets.iter().any(|m| m.symbol == self.symbol) {
                warn!(venue = %venue_id, symbol = %self.symbol, "Venue does not list symbol");
            }
        }

        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.update_prices().await;

        let opportunities = find_opportunities(
            &self.symbol,
            &self.venue_ids,
            &self.last_prices,
            self.min_profit_percent,
        );
        for opportunity in &opportunities {
            info!(
                buy_venue = %opportunity.buy_venue,
                sell_venue = %opportunity.sell_venue,
                buy_price = %opportunity.buy_price,
                sell_price = %opportunity.sell_price,
                profit_pct = %opportunity.profit_pct,
                "Found arbitrage opportunity"
            );
            self.execute(opportunity).await;
        }

        self.update_active_arbitrages().await;
        self.log_status();
        Ok(())
    }

    async fn on_stop(&mut self) {
        info!("Stopping arbitrage strategy");

        for arb in self.active_arbitrages.iter_mut() {
            if arb.status != ArbStatus::Active {
                continue;
            }
            self.venues
                .cancel_order(&arb.buy_venue, &arb.buy_order_id, Some(&self.symbol))
                .await;
            self.venues
                .cancel_order(&arb.sell_venue, &arb.sell_order_id, Some(&self.symbol))
                .await;
            arb.status = ArbStatus::Cancelled;
            info!(arb = %arb.id, "Cancelled arbitrage");
        }
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}
