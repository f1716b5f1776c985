//! Grid trading strategy.
//!
//! Lays a fixed ladder of limit orders across a price range: buys below the
//! current price, sells above it. A filled level is re-armed at the same
//! price on the opposite side, so the ladder's geometry never drifts.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::{OrderRequest, OrderSide, OrderStatus, Symbol};
use crate::error::{Error, Result};
use crate::venue::VenueRegistry;

use super::registry::StrategyDefinition;
use super::{ParamKind, ParamSpec, Parameters, Strategy, StrategyDescriptor, StrategyState};

pub const STRATEGY_ID: &str = "grid_trading";

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        id: STRATEGY_ID,
        name: "Grid Trading",
        description: "Creates a grid of buy and sell orders at regular price intervals. Profits \
                      from price oscillations within a range by buying low and selling high. \
                      Works best in sideways markets with regular price movements.",
        parameters: vec![
            ParamSpec::required("exchange_id", ParamKind::String, "Exchange to trade on"),
            ParamSpec::required(
                "symbol",
                ParamKind::String,
                "Market symbol to trade (e.g., BTC/USDT)",
            ),
            ParamSpec::required(
                "lower_price",
                ParamKind::Decimal,
                "Lower price boundary for the grid",
            ),
            ParamSpec::required(
                "upper_price",
                ParamKind::Decimal,
                "Upper price boundary for the grid",
            ),
            ParamSpec::optional(
                "grid_levels",
                ParamKind::Integer,
                "Number of grid levels",
                json!(10),
            )
            .with_min(2.0)
            .with_max(100.0),
            ParamSpec::required(
                "total_investment",
                ParamKind::Decimal,
                "Total investment amount in quote currency",
            ),
            ParamSpec::optional(
                "tick_interval",
                ParamKind::Integer,
                "Interval between strategy updates in seconds",
                json!(60),
            )
            .with_min(10.0),
        ],
        required_exchanges: vec![],
        required_markets: vec![],
    }
}

pub fn definition() -> StrategyDefinition {
    StrategyDefinition {
        descriptor: descriptor(),
        build: |venues, parameters, state| {
            Ok(Box::new(GridStrategy::from_parameters(
                venues, parameters, state,
            )?))
        },
    }
}

/// Evenly spaced price levels spanning `[lower, upper]`.
///
/// The final level is pinned to `upper` so decimal rounding in the step
/// cannot shorten the range.
pub fn grid_prices(lower: Decimal, upper: Decimal, levels: u32) -> Vec<Decimal> {
    let step = (upper - lower) / Decimal::from(levels - 1);
    (0..levels)
        .map(|i| {
            if i == levels - 1 {
                upper
            } else {
                lower + step * Decimal::from(i)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    Open,
    Filled,
    Cancelled,
}

/// One cell of the grid: a live order pinned to a grid price.
#[derive(Debug, Clone)]
struct GridSlot {
    order_id: String,
    price: Decimal,
    side: OrderSide,
    status: SlotStatus,
}

pub struct GridStrategy {
    venues: Arc<VenueRegistry>,
    state: Arc<StrategyState>,
    venue_id: String,
    symbol: Symbol,
    lower_price: Decimal,
    upper_price: Decimal,
    grid_levels: u32,
    total_investment: Decimal,
    tick_interval: Duration,
    /// Quote-currency budget per level.
    order_size_quote: Decimal,
    /// Ticker `last` captured at grid creation; PnL reference for sell fills.
    anchor_price: Option<Decimal>,
    slots: Vec<GridSlot>,
}

impl GridStrategy {
    pub fn from_parameters(
        venues: Arc<VenueRegistry>,
        parameters: &Parameters,
        state: Arc<StrategyState>,
    ) -> Result<Self> {
        let venue_id = parameters.string("exchange_id")?;
        let symbol: Symbol = parameters.string("symbol")?.parse()?;
        let lower_price = parameters.decimal("lower_price")?;
        let upper_price = parameters.decimal("upper_price")?;
        let total_investment = parameters.decimal("total_investment")?;

        if lower_price >= upper_price {
            return Err(Error::StrategyParams(
                "Lower price must be less than upper price".to_string(),
            ));
        }

        let grid_levels = parameters.u64_or("grid_levels", 10)?;
        if !(2..=100).contains(&grid_levels) {
            return Err(Error::StrategyParams(
                "grid_levels must be between 2 and 100".to_string(),
            ));
        }
        let grid_levels = grid_levels as u32;

        let tick_interval = parameters.u64_or("tick_interval", 60)?.max(10);

        Ok(Self {
            venues,
            state,
            venue_id,
            symbol,
            lower_price,
            upper_price,
            grid_levels,
            total_investment,
            tick_interval: Duration::from_secs(tick_interval),
            order_size_quote: total_investment / Decimal::from(grid_levels),
            anchor_price: None,
            slots: Vec::new(),
        })
    }

    /// Place the initial ladder around the current price.
    async fn place_grid(&mut self) {
        let Some(ticker) = self.venues.fetch_ticker(&self.venue_id, &self.symbol).await else {
            error!(venue = %self.venue_id, symbol = %self.symbol, "Failed to fetch ticker");
            return;
        };
        let current_price = ticker.last.unwrap_or(Decimal::ZERO);
        if current_price <= Decimal::ZERO {
            error!(%current_price, "Invalid current price, grid not placed");
            return;
        }
        self.anchor_price = Some(current_price);

        for price in grid_prices(self.lower_price, self.upper_price, self.grid_levels) {
            let side = if price < current_price {
                OrderSide::Buy
            } else if price > current_price {
                OrderSide::Sell
            } else {
                continue;
            };

            let amount = self.order_size_quote / price;
            let request = OrderRequest::limit(self.symbol.clone(), side, amount, price);

            if let Some(order) = self.venues.create_order(&self.venue_id, &request).await {
                info!(side = %side, %price, %amount, "Placed grid order");
                self.slots.push(GridSlot {
                    order_id: order.id,
                    price,
                    side,
                    status: SlotStatus::Open,
                });
            }
        }
    }

    /// Mark slots whose orders left the open set and were confirmed filled.
    async fn update_order_status(&mut self) {
        let open_orders = self
            .venues
            .fetch_open_orders(&self.venue_id, Some(&self.symbol))
            .await;
        let open_ids: HashSet<&str> = open_orders.iter().map(|o| o.id.as_str()).collect();

        for slot in self.slots.iter_mut() {
            if slot.status != SlotStatus::Open || open_ids.contains(slot.order_id.as_str()) {
                continue;
            }

            let Some(order) = self
                .venues
                .fetch_order(&self.venue_id, &slot.order_id, Some(&self.symbol))
                .await
            else {
                continue;
            };
            if order.status != OrderStatus::Closed {
                continue;
            }

            slot.status = SlotStatus::Filled;
            info!(side = %slot.side, price = %slot.price, "Grid order filled");

            // Best-effort PnL: sell fills measured against the price the
            // grid was anchored at.
            if slot.side == OrderSide::Sell {
                if let Some(anchor) = self.anchor_price {
                    let pnl = slot.price - anchor;
                    self.state.record_trade(pnl, pnl > Decimal::ZERO);
                }
            }
        }
    }

    /// Re-arm filled slots on the opposite side at the same price.
    async fn replace_filled_orders(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.status != SlotStatus::Filled {
                continue;
            }

            let new_side = slot.side.opposite();
            let amount = self.order_size_quote / slot.price;
            let request = OrderRequest::limit(self.symbol.clone(), new_side, amount, slot.price);

            match self.venues.create_order(&self.venue_id, &request).await {
                Some(order) => {
                    info!(
                        old_side = %slot.side,
                        new_side = %new_side,
                        price = %slot.price,
                        "Replaced filled grid order"
                    );
                    slot.order_id = order.id;
                    slot.side = new_side;
                    slot.status = SlotStatus::Open;
                }
                // Slot stays filled; the next tick retries.
                None => warn!(price = %slot.price, "Failed to replace filled grid order"),
            }
        }
    }

    fn log_status(&self) {
        let open_buys = self
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Open && s.side == OrderSide::Buy)
            .count();
        let open_sells = self
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Open && s.side == OrderSide::Sell)
            .count();
        let filled = self
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Filled)
            .count();

        let performance = self.state.performance();
        info!(
            open_buys,
            open_sells,
            filled,
            profit_loss = %performance.profit_loss,
            win_rate_pct = performance.win_rate_pct,
            "Grid status"
        );
    }
}

#[async_trait]
impl Strategy for GridStrategy {
    async fn on_start(&mut self) -> Result<()> {
        info!(
            venue = %self.venue_id,
            symbol = %self.symbol,
            levels = self.grid_levels,
            lower = %self.lower_price,
            upper = %self.upper_price,
            investment = %self.total_investment,
            "Starting grid trading strategy"
        );

        self.place_grid().await;
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.update_order_status().await;
        self.replace_filled_orders().await;
        self.log_status();
        Ok(())
    }

    async fn on_stop(&mut self) {
        info!("Stopping grid trading strategy");

        for slot in self.slots.iter_mut() {
            if slot.status != SlotStatus::Open {
                continue;
            }
            if self
                .venues
                .cancel_order(&self.venue_id, &slot.order_id, Some(&self.symbol))
                .await
            {
                slot.status = SlotStatus::Cancelled;
                info!(side = %slot.side, price = %slot.price, "Cancelled grid order");
            }
        }
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_grid_prices_shape() {
        let prices = grid_prices(dec!(100), dec!(110), 5);
        assert_eq!(
            prices,
            vec![dec!(100), dec!(102.5), dec!(105), dec!(107.5), dec!(110)]
        );
    }

    #[test]
    fn test_grid_prices_properties() {
        let lower = dec!(0.5);
        let upper = dec!(2.0);
        let levels = 7;
        let prices = grid_prices(lower, upper, levels);

        assert_eq!(prices.len(), levels as usize);
        assert_eq!(prices[0], lower);
        assert_eq!(*prices.last().unwrap(), upper);
        assert!(prices.windows(2).all(|w| w[0] < w[1]));

        let step = (upper - lower) / Decimal::from(levels - 1);
        for window in prices.windows(2) {
            assert_eq!(window[1] - window[0], step);
        }
    }

    #[test]
    fn test_grid_prices_minimum_levels() {
        let prices = grid_prices(dec!(10), dec!(20), 2);
        assert_eq!(prices, vec![dec!(10), dec!(20)]);
    }
}
