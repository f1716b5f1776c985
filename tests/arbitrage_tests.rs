//! Integration tests for the arbitrage strategy against mock venues.

use std::sync::Arc;

use gridarb::config::PermissionLevel;
use gridarb::domain::{OrderSide, Symbol};
use gridarb::strategy::arbitrage::ArbitrageStrategy;
use gridarb::strategy::{Parameters, Strategy, StrategyState};
use gridarb::testkit::{ticker, venue_config, MockVenue};
use gridarb::venue::VenueRegistry;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn params(value: Value) -> Parameters {
    match value {
        Value::Object(map) => Parameters::new(map),
        _ => panic!("expected object"),
    }
}

fn symbol() -> Symbol {
    "BTC/USDT".parse().unwrap()
}

struct Setup {
    registry: Arc<VenueRegistry>,
    alpha: Arc<MockVenue>,
    beta: Arc<MockVenue>,
    state: Arc<StrategyState>,
}

/// Two venues with a 2% gap: buy on alpha at 100, sell on beta at 102.
fn setup(alpha_level: PermissionLevel, beta_level: PermissionLevel) -> Setup {
    let registry = Arc::new(VenueRegistry::new());
    let alpha = Arc::new(MockVenue::new("alpha"));
    let beta = Arc::new(MockVenue::new("beta"));
    let symbol = symbol();

    alpha.set_ticker(ticker(&symbol, dec!(99), dec!(100), dec!(99.5)));
    beta.set_ticker(ticker(&symbol, dec!(102), dec!(103), dec!(102.5)));
    alpha.set_balance("USDT", dec!(1000));
    beta.set_balance("BTC", dec!(5));
    alpha.set_markets(&[symbol.clone()]);
    beta.set_markets(&[symbol.clone()]);

    registry.add_with_adapter(venue_config("alpha", alpha_level), alpha.clone());
    registry.add_with_adapter(venue_config("beta", beta_level), beta.clone());

    Setup {
        registry,
        alpha,
        beta,
        state: Arc::new(StrategyState::new()),
    }
}

fn strategy(setup: &Setup) -> ArbitrageStrategy {
    let parameters = params(json!({
        "symbol": "BTC/USDT",
        "exchanges": ["alpha", "beta"],
        "max_order_size": 1.0,
        "min_profit_percent": 1.0,
        "tick_interval": 1,
    }));
    ArbitrageStrategy::from_parameters(setup.registry.clone(), &parameters, setup.state.clone())
        .unwrap()
}

#[test]
fn test_construction_rejects_missing_parameters() {
    let registry = Arc::new(VenueRegistry::new());
    let state = Arc::new(StrategyState::new());

    for missing in ["symbol", "exchanges", "max_order_size"] {
        let mut map = json!({
            "symbol": "BTC/USDT",
            "exchanges": ["alpha", "beta"],
            "max_order_size": 1.0,
        });
        map.as_object_mut().unwrap().remove(missing);

        let result =
            ArbitrageStrategy::from_parameters(registry.clone(), &params(map), state.clone());
        assert!(result.is_err(), "expected failure without {}", missing);
    }
}

#[test]
fn test_construction_rejects_single_exchange() {
    let registry = Arc::new(VenueRegistry::new());
    let state = Arc::new(StrategyState::new());

    let result = ArbitrageStrategy::from_parameters(
        registry,
        &params(json!({
            "symbol": "BTC/USDT",
            "exchanges": ["alpha"],
            "max_order_size": 1.0,
        })),
        state,
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_executes_opportunity_across_both_venues() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    let buys = setup.alpha.created_requests();
    assert_eq!(buys.len(), 1);
    assert_eq!(buys[0].side, OrderSide::Buy);
    assert_eq!(buys[0].price, Some(dec!(100)));
    assert_eq!(buys[0].amount, dec!(1));

    let sells = setup.beta.created_requests();
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].side, OrderSide::Sell);
    assert_eq!(sells[0].price, Some(dec!(102)));
    assert_eq!(sells[0].amount, dec!(1));

    assert_eq!(strategy.active_count(), 1);
}

#[tokio::test]
async fn test_order_size_capped_by_balances() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    // 50 USDT buys only 0.5 BTC at the 100 ask
    setup.alpha.set_balance("USDT", dec!(50));
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    let buys = setup.alpha.created_requests();
    assert_eq!(buys[0].amount, dec!(0.5));
}

#[tokio::test]
async fn test_skips_when_balance_exhausted() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    setup.beta.set_balance("BTC", Decimal::ZERO);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    assert!(setup.alpha.created_requests().is_empty());
    assert!(setup.beta.created_requests().is_empty());
    assert_eq!(strategy.active_count(), 0);
}

#[tokio::test]
async fn test_skips_without_trade_permission() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadOnly);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    assert!(setup.alpha.created_requests().is_empty());
    assert!(setup.beta.created_requests().is_empty());
}

#[tokio::test]
async fn test_failed_sell_leg_cancels_buy_leg() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    setup.beta.set_fail_create(true);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    assert_eq!(setup.alpha.created_requests().len(), 1);
    // The live buy leg was unwound before the tick finished
    assert_eq!(setup.alpha.cancel_requests(), vec!["alpha-1".to_string()]);
    assert_eq!(strategy.active_count(), 0);
}

#[tokio::test]
async fn test_completion_records_realized_profit() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();
    assert_eq!(strategy.active_count(), 1);

    // Both legs settle; remove the price gap so the next tick only polls
    setup.alpha.fill_order("alpha-1");
    setup.beta.fill_order("beta-1");
    let symbol = symbol();
    setup
        .alpha
        .set_ticker(ticker(&symbol, dec!(99), dec!(103), dec!(99.5)));
    setup
        .beta
        .set_ticker(ticker(&symbol, dec!(102), dec!(103), dec!(102.5)));

    strategy.tick().await.unwrap();

    assert_eq!(strategy.active_count(), 0);
    let performance = setup.state.performance();
    assert_eq!(performance.trades, 1);
    assert_eq!(performance.profit_loss, dec!(2));
    assert_eq!(performance.win_count, 1);
}

#[tokio::test]
async fn test_cancelled_leg_fails_arbitrage_and_unwinds_other() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();

    // The venue cancelled the buy leg out from under us
    setup.alpha.mark_canceled("alpha-1");
    let symbol = symbol();
    setup
        .alpha
        .set_ticker(ticker(&symbol, dec!(99), dec!(103), dec!(99.5)));

    strategy.tick().await.unwrap();

    assert_eq!(strategy.active_count(), 0);
    // The still-open sell leg was cancelled in response
    assert!(setup
        .beta
        .cancel_requests()
        .contains(&"beta-1".to_string()));
    assert_eq!(setup.state.performance().trades, 0);
}

#[tokio::test]
async fn test_on_stop_cancels_active_legs() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    let mut strategy = strategy(&setup);

    strategy.tick().await.unwrap();
    assert_eq!(strategy.active_count(), 1);

    strategy.on_stop().await;

    assert_eq!(setup.alpha.cancel_requests(), vec!["alpha-1".to_string()]);
    assert_eq!(setup.beta.cancel_requests(), vec!["beta-1".to_string()]);
}

#[tokio::test]
async fn test_on_start_tolerates_missing_market() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    setup.alpha.set_markets(&[]);
    let mut strategy = strategy(&setup);

    // Missing symbol on a venue warns but does not fail the start
    assert!(strategy.on_start().await.is_ok());
}

#[tokio::test]
async fn test_venue_fault_skips_tick_gracefully() {
    let setup = setup(PermissionLevel::ReadWrite, PermissionLevel::ReadWrite);
    setup.alpha.set_fail_all(true);

    let mut strategy = strategy(&setup);
    strategy.tick().await.unwrap();

    // One-sided quotes mean no opportunity and no orders
    assert!(setup.beta.created_requests().is_empty());
}
