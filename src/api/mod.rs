//! HTTP control plane.
//!
//! Request/response surface for inspecting venues, switching strategies and
//! starting/stopping execution. Error mapping: unknown venue or strategy is
//! 404, a permission-gate refusal is 403, an empty or failed adapter result
//! is 400.

mod error;
mod exchanges;
mod strategies;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::error::Result;
use crate::strategy::StrategyRegistry;
use crate::venue::VenueRegistry;

pub use error::ApiError;

/// Shared state behind every handler.
pub struct AppState {
    pub venues: Arc<VenueRegistry>,
    pub strategies: Arc<StrategyRegistry>,
    config: Mutex<BotConfig>,
    config_path: PathBuf,
}

impl AppState {
    pub fn new(
        venues: Arc<VenueRegistry>,
        strategies: Arc<StrategyRegistry>,
        config: BotConfig,
        config_path: PathBuf,
    ) -> Self {
        Self {
            venues,
            strategies,
            config: Mutex::new(config),
            config_path,
        }
    }

    /// Read from the config under the lock.
    pub fn config<R>(&self, f: impl FnOnce(&BotConfig) -> R) -> R {
        f(&self.config.lock())
    }

    /// Mutate the config and persist it atomically.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut BotConfig) -> R) -> R {
        let mut config = self.config.lock();
        let result = f(&mut config);
        if let Err(e) = config.save(&self.config_path) {
            error!(error = %e, "Failed to persist config");
        }
        result
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "gridarb control plane" }))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<BotConfig> {
    Json(state.config(|c| c.clone()))
}

async fn replace_config(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<BotConfig>, axum::extract::rejection::JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let Json(new_config) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    state.update_config(|c| *c = new_config);
    Ok(Json(json!({ "message": "Configuration updated successfully" })))
}

async fn supported_exchanges(State(state): State<Arc<AppState>>) -> Json<Vec<&'static str>> {
    Json(state.venues.supported_venues())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/exchanges", get(exchanges::list).post(exchanges::add))
        .route(
            "/exchanges/{id}",
            get(exchanges::get_one).delete(exchanges::remove),
        )
        .route("/exchanges/{id}/test", post(exchanges::test))
        .route("/exchanges/{id}/balance", get(exchanges::balance))
        .route("/exchanges/{id}/markets", get(exchanges::markets))
        .route("/exchanges/{id}/ticker/{symbol}", get(exchanges::ticker))
        .route(
            "/exchanges/{id}/orders",
            get(exchanges::orders).post(exchanges::create_order),
        )
        .route(
            "/exchanges/{id}/orders/{order_id}",
            delete(exchanges::cancel_order),
        )
        .route("/strategies", get(strategies::list))
        .route("/strategies/{id}", get(strategies::get_one))
        .route("/strategies/active", post(strategies::set_active))
        .route("/strategies/start", post(strategies::start))
        .route("/strategies/stop", post(strategies::stop))
        .route("/strategies/status", get(strategies::status))
        .route("/config", get(get_config).post(replace_config))
        .route("/supported-exchanges", get(supported_exchanges))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the control plane until the task is cancelled.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Control plane listening");
    axum::serve(listener, app).await?;
    Ok(())
}
