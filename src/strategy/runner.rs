//! Strategy lifecycle and the cooperative tick loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;

use super::{Parameters, StrategyDescriptor, StrategyState};

/// Grace interval after a failed tick before the loop resumes.
const TICK_ERROR_GRACE: Duration = Duration::from_secs(5);

/// One periodic strategy implementation.
///
/// The runner task is the only caller and the only owner of the instance's
/// private mutable state. Trade realizations are reported through the shared
/// [`StrategyState`] handed to the constructor.
#[async_trait]
pub trait Strategy: Send {
    /// Invoked exactly once before the first tick. An error here is fatal:
    /// the loop never starts and `on_stop` is not invoked.
    async fn on_start(&mut self) -> Result<()>;

    /// One periodic update. Errors are isolated: the loop logs, sleeps a
    /// short grace interval and continues.
    async fn tick(&mut self) -> Result<()>;

    /// Invoked exactly once when the loop exits; runs to completion even if
    /// a stop was requested mid-tick.
    async fn on_stop(&mut self);

    /// Pause between successful ticks.
    fn tick_interval(&self) -> Duration;
}

struct RunnerInner {
    /// Present while the strategy is idle; taken by the running task and
    /// handed back on stop so the strategy can be restarted.
    strategy: Option<Box<dyn Strategy>>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<Box<dyn Strategy>>>,
}

/// Owns one strategy instance and drives its tick loop.
pub struct StrategyRunner {
    descriptor: StrategyDescriptor,
    parameters: Parameters,
    state: Arc<StrategyState>,
    inner: Mutex<RunnerInner>,
}

impl StrategyRunner {
    pub fn new(
        descriptor: StrategyDescriptor,
        parameters: Parameters,
        state: Arc<StrategyState>,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        Self {
            descriptor,
            parameters,
            state,
            inner: Mutex::new(RunnerInner {
                strategy: Some(strategy),
                stop_tx: None,
                task: None,
            }),
        }
    }

    pub fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn state(&self) -> &Arc<StrategyState> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Start the tick loop. No-op when already running.
    pub async fn start(&self) {
        let mut inner = self.inner.lock().await;

        if self.state.is_running() {
            warn!(strategy = self.descriptor.id, "Strategy is already running");
            return;
        }
        let Some(strategy) = inner.strategy.take() else {
            warn!(strategy = self.descriptor.id, "Strategy instance unavailable");
            return;
        };

        self.state.mark_started();

        let (stop_tx, stop_rx) = watch::channel(false);
        let state = self.state.clone();
        let task = tokio::spawn(run_loop(strategy, state, stop_rx));

        inner.stop_tx = Some(stop_tx);
        inner.task = Some(task);

        info!(strategy = self.descriptor.id, "Started strategy");
    }

    /// Stop the tick loop and wait for `on_stop` to finish. No-op when not
    /// running.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;

        if !self.state.is_running() && inner.task.is_none() {
            warn!(strategy = self.descriptor.id, "Strategy is not running");
            return;
        }

        self.state.set_running(false);
        if let Some(stop_tx) = inner.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = inner.task.take() {
            match task.await {
                Ok(strategy) => inner.strategy = Some(strategy),
                Err(e) => error!(
                    strategy = self.descriptor.id,
                    error = %e,
                    "Strategy task panicked"
                ),
            }
        }

        info!(strategy = self.descriptor.id, "Stopped strategy");
    }
}

/// The scheduler: cooperative, single-task, fault-isolated per tick.
async fn run_loop(
    mut strategy: Box<dyn Strategy>,
    state: Arc<StrategyState>,
    mut stop_rx: watch::Receiver<bool>,
) -> Box<dyn Strategy> {
    if let Err(e) = strategy.on_start().await {
        error!(error = %e, "Fatal error starting strategy");
        state.set_running(false);
        return strategy;
    }

    let interval = strategy.tick_interval();

    while state.is_running() {
        let delay = tokio::select! {
            _ = stop_rx.changed() => break,
            result = strategy.tick() => match result {
                Ok(()) => {
                    state.touch_tick();
                    interval
                }
                Err(e) => {
                    error!(error = %e, "Error in strategy tick");
                    TICK_ERROR_GRACE
                }
            },
        };

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    // Stop requests during shutdown are ignored; on_stop runs to completion.
    strategy.on_stop().await;
    state.set_running(false);
    strategy
}
