//! Integration tests for the HTTP control plane.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gridarb::api::{router, AppState};
use gridarb::config::{BotConfig, PermissionLevel};
use gridarb::domain::Symbol;
use gridarb::strategy::StrategyRegistry;
use gridarb::testkit::{ticker, venue_config, MockVenue};
use gridarb::venue::VenueRegistry;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct Setup {
    app: Router,
    venue: Arc<MockVenue>,
    _dir: TempDir,
}

fn setup(permission: PermissionLevel) -> Setup {
    let venues = Arc::new(VenueRegistry::new());
    let venue = Arc::new(MockVenue::new("alpha"));
    let symbol: Symbol = "BTC/USDT".parse().unwrap();
    venue.set_ticker(ticker(&symbol, dec!(99), dec!(100), dec!(99.5)));
    venue.set_markets(&[symbol]);
    venues.add_with_adapter(venue_config("alpha", permission), venue.clone());

    let mut config = BotConfig::default();
    config.exchanges = vec![venue_config("alpha", permission)];

    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(
        venues,
        Arc::new(StrategyRegistry::builtin()),
        config,
        dir.path().join("config.json"),
    ));

    Setup {
        app: router(state),
        venue,
        _dir: dir,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_strategies() {
    let setup = setup(PermissionLevel::ReadOnly);

    let response = setup.app.oneshot(get("/strategies")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"arbitrage"));
    assert!(ids.contains(&"grid_trading"));
}

#[tokio::test]
async fn test_unknown_strategy_is_404() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup.app.oneshot(get("/strategies/momentum")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_exchange_is_404() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup.app.oneshot(get("/exchanges/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_order_without_permission_is_403() {
    let setup = setup(PermissionLevel::ReadOnly);

    let request = post_json(
        "/exchanges/alpha/orders",
        json!({
            "symbol": "BTC/USDT",
            "order_type": "limit",
            "side": "buy",
            "amount": "1",
            "price": "100",
        }),
    );
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("does not have read_write permission"));
    // The gate refused before the adapter was reached
    assert!(setup.venue.created_requests().is_empty());
}

#[tokio::test]
async fn test_create_order_with_permission() {
    let setup = setup(PermissionLevel::ReadWrite);

    let request = post_json(
        "/exchanges/alpha/orders",
        json!({
            "symbol": "BTC/USDT",
            "order_type": "limit",
            "side": "buy",
            "amount": "1",
            "price": "100",
        }),
    );
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["venue_id"], "alpha");
    assert_eq!(body["status"], "open");
    assert_eq!(setup.venue.created_requests().len(), 1);
}

#[tokio::test]
async fn test_balance_empty_is_400() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup
        .app
        .clone()
        .oneshot(get("/exchanges/alpha/balance"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_balance_with_funds() {
    let setup = setup(PermissionLevel::ReadOnly);
    setup.venue.set_balance("USDT", dec!(1000));

    let response = setup
        .app
        .clone()
        .oneshot(get("/exchanges/alpha/balance"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["USDT"]["free"], "1000");
}

#[tokio::test]
async fn test_ticker_accepts_dashed_symbol() {
    let setup = setup(PermissionLevel::ReadOnly);

    let response = setup
        .app
        .clone()
        .oneshot(get("/exchanges/alpha/ticker/BTC-USDT"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["symbol"], "BTC/USDT");
    assert_eq!(body["bid"], "99");
}

#[tokio::test]
async fn test_ticker_rejects_malformed_symbol() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup
        .app
        .clone()
        .oneshot(get("/exchanges/alpha/ticker/BTCUSDT"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_exchange_with_unknown_adapter_is_400() {
    let setup = setup(PermissionLevel::ReadOnly);

    let request = post_json(
        "/exchanges",
        serde_json::to_value(venue_config("binance", PermissionLevel::ReadOnly)).unwrap(),
    );
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_supported_exchanges() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup
        .app
        .clone()
        .oneshot(get("/supported-exchanges"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(ids.contains(&"tradeogre"));
}

#[tokio::test]
async fn test_strategy_status_inactive() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup
        .app
        .clone()
        .oneshot(get("/strategies/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn test_start_without_active_strategy_is_400() {
    let setup = setup(PermissionLevel::ReadOnly);
    let response = setup
        .app
        .clone()
        .oneshot(post_json("/strategies/start", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_active_and_status_round_trip() {
    let setup = setup(PermissionLevel::ReadWrite);

    let request = post_json(
        "/strategies/active",
        json!({
            "strategy_id": "grid_trading",
            "parameters": {
                "exchange_id": "alpha",
                "symbol": "BTC/USDT",
                "lower_price": 90,
                "upper_price": 110,
                "total_investment": 1000,
            },
        }),
    );
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = setup
        .app
        .clone()
        .oneshot(get("/strategies/status"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["active"], true);
    assert_eq!(body["id"], "grid_trading");
    assert_eq!(body["running"], false);
}

#[tokio::test]
async fn test_set_active_with_bad_parameters_is_400() {
    let setup = setup(PermissionLevel::ReadWrite);

    let request = post_json(
        "/strategies/active",
        json!({ "strategy_id": "grid_trading", "parameters": {} }),
    );
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let setup = setup(PermissionLevel::ReadWrite);

    let request = Request::builder()
        .method("POST")
        .uri("/strategies/active")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Well-formed JSON with the wrong shape is still a bad request
    let request = post_json("/strategies/active", json!({ "nope": true }));
    let response = setup.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_round_trip() {
    let setup = setup(PermissionLevel::ReadOnly);

    let response = setup.app.clone().oneshot(get("/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = body_json(response).await;
    config["active_strategy"] = json!("arbitrage");

    let response = setup
        .app
        .clone()
        .oneshot(post_json("/config", config))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = setup.app.clone().oneshot(get("/config")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["active_strategy"], "arbitrage");
}
