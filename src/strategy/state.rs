//! Shared per-strategy state.
//!
//! The strategy task is the single writer; the control plane reads without
//! coordination and may observe slightly stale values.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;

/// Cumulative trade-realization counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Performance {
    pub trades: u64,
    pub profit_loss: Decimal,
    pub win_count: u64,
    pub win_rate_pct: f64,
    pub max_drawdown: Decimal,
}

impl Performance {
    /// Fold one realized trade into the counters.
    pub fn record(&mut self, pnl: Decimal, is_win: bool) {
        self.trades += 1;
        self.profit_loss += pnl;
        if is_win {
            self.win_count += 1;
        }
        self.win_rate_pct = (self.win_count as f64 / self.trades as f64) * 100.0;

        let current_drawdown = self.profit_loss.min(Decimal::ZERO);
        self.max_drawdown = self.max_drawdown.min(current_drawdown);
    }
}

/// Live state of one strategy instance, shared between the runner task and
/// control-plane readers.
#[derive(Default)]
pub struct StrategyState {
    running: AtomicBool,
    start_time: RwLock<Option<DateTime<Utc>>>,
    last_tick_time: RwLock<Option<DateTime<Utc>>>,
    performance: RwLock<Performance>,
}

impl StrategyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Flag running and stamp start/last-tick times.
    pub fn mark_started(&self) {
        let now = Utc::now();
        self.running.store(true, Ordering::SeqCst);
        *self.start_time.write() = Some(now);
        *self.last_tick_time.write() = Some(now);
    }

    /// Stamp a successful tick.
    pub fn touch_tick(&self) {
        *self.last_tick_time.write() = Some(Utc::now());
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.start_time.read()
    }

    pub fn last_tick_time(&self) -> Option<DateTime<Utc>> {
        *self.last_tick_time.read()
    }

    pub fn record_trade(&self, pnl: Decimal, is_win: bool) {
        self.performance.write().record(pnl, is_win);
    }

    pub fn performance(&self) -> Performance {
        self.performance.read().clone()
    }
}
