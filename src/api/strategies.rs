//! Strategy endpoints: metadata, activation, lifecycle, status.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::strategy::{ActiveStatus, Parameters, StrategyDescriptor};

use super::error::ApiError;
use super::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<StrategyDescriptor>> {
    Json(
        state
            .strategies
            .all_strategies_info()
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(strategy_id): Path<String>,
) -> Result<Json<StrategyDescriptor>, ApiError> {
    state
        .strategies
        .strategy_info(&strategy_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Strategy {} not found", strategy_id)))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub strategy_id: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

pub async fn set_active(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SetActiveBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    // Strategies resolve venues through the registry; make sure every
    // configured venue is registered before handing it over.
    let configured = state.config(|c| c.exchanges.clone());
    for venue in configured {
        if state.venues.get(&venue.venue_id).is_none() {
            state.venues.add(venue);
        }
    }

    let parameters = Parameters::new(body.parameters.clone());
    let installed = state
        .strategies
        .set_active(&body.strategy_id, state.venues.clone(), parameters)
        .await;
    if !installed {
        return Err(ApiError::BadRequest(format!(
            "Failed to set active strategy to {}",
            body.strategy_id
        )));
    }

    state.update_config(|c| {
        c.active_strategy = Some(body.strategy_id.clone());
        c.strategy_params = body.parameters.clone();
    });

    Ok(Json(json!({
        "message": format!("Active strategy set to {}", body.strategy_id)
    })))
}

pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    if !state.strategies.start_active().await {
        return Err(ApiError::BadRequest(
            "No active strategy to start".to_string(),
        ));
    }
    Ok(Json(json!({ "message": "Active strategy started" })))
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    if !state.strategies.stop_active().await {
        return Err(ApiError::BadRequest(
            "No active strategy to stop".to_string(),
        ));
    }
    Ok(Json(json!({ "message": "Active strategy stopped" })))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<ActiveStatus> {
    Json(state.strategies.active_status().await)
}
