//! Exchange endpoints: configuration CRUD and venue passthroughs.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{PermissionLevel, VenueConfig};
use crate::domain::{Balances, Market, Order, OrderKind, OrderRequest, OrderSide, Symbol, Ticker};

use super::error::ApiError;
use super::AppState;

/// Symbol path segments arrive URL-decoded (`BTC/USDT`) or dashed
/// (`BTC-USDT`).
fn parse_symbol_param(raw: &str) -> Result<Symbol, ApiError> {
    let parsed = if raw.contains('/') {
        raw.parse()
    } else {
        Symbol::from_dashed(raw)
    };
    parsed.map_err(|_| ApiError::BadRequest(format!("Invalid symbol: {}", raw)))
}

fn venue_config(state: &AppState, venue_id: &str) -> Result<VenueConfig, ApiError> {
    state
        .config(|c| c.get_exchange(venue_id).cloned())
        .ok_or_else(|| ApiError::NotFound(format!("Exchange {} not found", venue_id)))
}

/// Lazily (re-)register the venue with the registry, mirroring how the
/// control plane may be asked about venues configured before this process
/// started.
fn ensure_registered(state: &AppState, config: &VenueConfig) {
    if state.venues.get(&config.venue_id).is_none() {
        state.venues.add(config.clone());
    }
}

fn require_permission(
    state: &AppState,
    venue_id: &str,
    required: PermissionLevel,
) -> Result<(), ApiError> {
    if state.venues.check_permission(venue_id, required) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(format!(
            "Exchange {} does not have {} permission",
            venue_id, required
        )))
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<VenueConfig>> {
    Json(state.config(|c| c.exchanges.clone()))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<VenueConfig>, ApiError> {
    venue_config(&state, &venue_id).map(Json)
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VenueConfig>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(config) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let venue_id = config.venue_id.clone();
    state.update_config(|c| c.upsert_exchange(config.clone()));

    if !state.venues.add(config) {
        return Err(ApiError::BadRequest(format!(
            "Failed to add exchange {}",
            venue_id
        )));
    }

    Ok(Json(json!({
        "message": format!("Exchange {} added successfully", venue_id)
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.update_config(|c| c.remove_exchange(&venue_id));
    if !removed {
        return Err(ApiError::NotFound(format!(
            "Exchange {} not found",
            venue_id
        )));
    }

    state.venues.remove(&venue_id);

    Ok(Json(json!({
        "message": format!("Exchange {} removed successfully", venue_id)
    })))
}

pub async fn test(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);

    if !state.venues.test_connection(&venue_id).await {
        return Err(ApiError::BadRequest(format!(
            "Connection to {} failed",
            venue_id
        )));
    }

    Ok(Json(json!({
        "message": format!("Connection to {} successful", venue_id)
    })))
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<Balances>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);
    require_permission(&state, &venue_id, PermissionLevel::ReadOnly)?;

    let balances = state.venues.fetch_balance(&venue_id).await;
    if balances.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Failed to fetch balance from {}",
            venue_id
        )));
    }
    Ok(Json(balances))
}

pub async fn markets(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<Vec<Market>>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);

    let markets = state.venues.fetch_markets(&venue_id).await;
    if markets.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Failed to fetch markets from {}",
            venue_id
        )));
    }
    Ok(Json(markets))
}

pub async fn ticker(
    State(state): State<Arc<AppState>>,
    Path((venue_id, symbol)): Path<(String, String)>,
) -> Result<Json<Ticker>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);
    let symbol = parse_symbol_param(&symbol)?;

    match state.venues.fetch_ticker(&venue_id, &symbol).await {
        Some(ticker) => Ok(Json(ticker)),
        None => Err(ApiError::BadRequest(format!(
            "Failed to fetch ticker for {} from {}",
            symbol, venue_id
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub symbol: Option<String>,
    pub status: Option<String>,
}

pub async fn orders(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);
    require_permission(&state, &venue_id, PermissionLevel::ReadOnly)?;

    let symbol = match &query.symbol {
        Some(raw) => Some(parse_symbol_param(raw)?),
        None => None,
    };

    let orders = match query.status.as_deref().unwrap_or("open") {
        "closed" => {
            state
                .venues
                .fetch_closed_orders(&venue_id, symbol.as_ref())
                .await
        }
        "all" => {
            let mut all = state
                .venues
                .fetch_open_orders(&venue_id, symbol.as_ref())
                .await;
            all.extend(
                state
                    .venues
                    .fetch_closed_orders(&venue_id, symbol.as_ref())
                    .await,
            );
            all
        }
        _ => {
            state
                .venues
                .fetch_open_orders(&venue_id, symbol.as_ref())
                .await
        }
    };

    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub symbol: Symbol,
    pub order_type: OrderKind,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    body: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);
    require_permission(&state, &venue_id, PermissionLevel::ReadWrite)?;

    let request = OrderRequest {
        symbol: body.symbol,
        side: body.side,
        kind: body.order_type,
        amount: body.amount,
        price: body.price,
    };

    match state.venues.create_order(&venue_id, &request).await {
        Some(order) => Ok(Json(order)),
        None => Err(ApiError::BadRequest(format!(
            "Failed to create order on {}",
            venue_id
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub symbol: Option<String>,
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path((venue_id, order_id)): Path<(String, String)>,
    Query(query): Query<CancelQuery>,
) -> Result<Json<Value>, ApiError> {
    let config = venue_config(&state, &venue_id)?;
    ensure_registered(&state, &config);
    require_permission(&state, &venue_id, PermissionLevel::ReadWrite)?;

    let symbol = match &query.symbol {
        Some(raw) => Some(parse_symbol_param(raw)?),
        None => None,
    };

    if !state
        .venues
        .cancel_order(&venue_id, &order_id, symbol.as_ref())
        .await
    {
        return Err(ApiError::BadRequest(format!(
            "Failed to cancel order {} on {}",
            order_id, venue_id
        )));
    }

    Ok(Json(json!({ "canceled": order_id })))
}
