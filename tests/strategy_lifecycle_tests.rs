//! Integration tests for the strategy runner and tick loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridarb::error::{Error, Result};
use gridarb::strategy::{
    Parameters, Strategy, StrategyDescriptor, StrategyRunner, StrategyState,
};

#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    ticks: AtomicUsize,
    stops: AtomicUsize,
}

struct CountingStrategy {
    counters: Arc<Counters>,
    fail_on_start: bool,
    fail_ticks: bool,
    interval: Duration,
}

impl CountingStrategy {
    fn new(counters: Arc<Counters>) -> Self {
        Self {
            counters,
            fail_on_start: false,
            fail_ticks: false,
            interval: Duration::from_millis(10),
        }
    }
}

#[async_trait]
impl Strategy for CountingStrategy {
    async fn on_start(&mut self) -> Result<()> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_start {
            return Err(Error::Venue("precondition failed".to_string()));
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.counters.ticks.fetch_add(1, Ordering::SeqCst);
        if self.fail_ticks {
            return Err(Error::Venue("tick failed".to_string()));
        }
        Ok(())
    }

    async fn on_stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn tick_interval(&self) -> Duration {
        self.interval
    }
}

fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        id: "counting",
        name: "Counting",
        description: "Counts lifecycle callbacks",
        parameters: vec![],
        required_exchanges: vec![],
        required_markets: vec![],
    }
}

fn runner_with(strategy: CountingStrategy) -> (StrategyRunner, Arc<StrategyState>) {
    let state = Arc::new(StrategyState::new());
    let runner = StrategyRunner::new(
        descriptor(),
        Parameters::empty(),
        state.clone(),
        Box::new(strategy),
    );
    (runner, state)
}

#[tokio::test]
async fn test_start_ticks_and_stop() {
    let counters = Arc::new(Counters::default());
    let (runner, state) = runner_with(CountingStrategy::new(counters.clone()));

    runner.start().await;
    assert!(state.is_running());
    assert!(state.start_time().is_some());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(counters.ticks.load(Ordering::SeqCst) >= 2);

    runner.stop().await;
    assert!(!state.is_running());
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert!(state.last_tick_time().is_some());
}

#[tokio::test]
async fn test_double_start_is_noop() {
    let counters = Arc::new(Counters::default());
    let (runner, state) = runner_with(CountingStrategy::new(counters.clone()));

    runner.start().await;
    runner.start().await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(state.is_running());
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);

    runner.stop().await;
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let counters = Arc::new(Counters::default());
    let (runner, state) = runner_with(CountingStrategy::new(counters.clone()));

    runner.stop().await;
    assert!(!state.is_running());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_double_stop_runs_on_stop_once() {
    let counters = Arc::new(Counters::default());
    let (runner, _state) = runner_with(CountingStrategy::new(counters.clone()));

    runner.start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.stop().await;
    runner.stop().await;

    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let counters = Arc::new(Counters::default());
    let (runner, state) = runner_with(CountingStrategy::new(counters.clone()));

    runner.start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.stop().await;

    let ticks_after_first_run = counters.ticks.load(Ordering::SeqCst);

    runner.start().await;
    assert!(state.is_running());
    tokio::time::sleep(Duration::from_millis(30)).await;
    runner.stop().await;

    assert!(counters.ticks.load(Ordering::SeqCst) > ticks_after_first_run);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_tick_error_does_not_terminate_loop() {
    let counters = Arc::new(Counters::default());
    let mut strategy = CountingStrategy::new(counters.clone());
    strategy.fail_ticks = true;
    let (runner, state) = runner_with(strategy);

    runner.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The first tick failed, but the loop survives in its grace sleep
    assert_eq!(counters.ticks.load(Ordering::SeqCst), 1);
    assert!(state.is_running());

    // A stop request interrupts the grace sleep promptly
    runner.stop().await;
    assert!(!state.is_running());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fatal_on_start_clears_running() {
    let counters = Arc::new(Counters::default());
    let mut strategy = CountingStrategy::new(counters.clone());
    strategy.fail_on_start = true;
    let (runner, state) = runner_with(strategy);

    runner.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!state.is_running());
    assert_eq!(counters.ticks.load(Ordering::SeqCst), 0);
    // The loop never ran, so the shutdown hook never fired
    assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_tick_does_not_stamp_tick_time() {
    let counters = Arc::new(Counters::default());
    let mut strategy = CountingStrategy::new(counters.clone());
    strategy.fail_ticks = true;
    let (runner, state) = runner_with(strategy);

    runner.start().await;
    let stamped_at_start = state.last_tick_time().unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Only the start stamp exists; the failing tick never touched it
    assert_eq!(state.last_tick_time().unwrap(), stamped_at_start);
    runner.stop().await;
}
