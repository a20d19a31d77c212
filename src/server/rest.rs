//! REST handlers under `/api/v1` plus `/health` (spec §6.1). Every handler
//! resolves its session from the `X-Session-ID` header (default
//! [`crate::session::DEFAULT_REST_SESSION`]) and shares the same
//! `HandlerContext` the WS router uses, so REST and WS place/cancel/query
//! orders through one code path.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{Order, OrderFilter, OrderStatus, PlaceOrderRequest};
use crate::error::{AppError, ErrorKind};
use crate::failure::StrategyStats;
use crate::money::Symbol;
use crate::session::DEFAULT_REST_SESSION;

use super::AppState;

fn session_of(headers: &HeaderMap) -> String {
    headers
        .get("X-Session-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_REST_SESSION.to_string())
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct SymbolsResponse {
    symbols: Vec<Symbol>,
}

pub async fn symbols(State(state): State<AppState>) -> Json<SymbolsResponse> {
    Json(SymbolsResponse {
        symbols: state.ctx.engine.symbols().await,
    })
}

#[derive(Deserialize)]
pub struct TickerQuery {
    symbol: Symbol,
}

#[derive(Serialize)]
pub struct TickerResponse {
    symbol: Symbol,
    price: Decimal,
    bid: Decimal,
    ask: Decimal,
    volume_24h: Decimal,
    timestamp: DateTime<Utc>,
}

pub async fn ticker(
    State(state): State<AppState>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<TickerResponse>, AppError> {
    if !state.ctx.engine.symbols().await.contains(&q.symbol) {
        return Err(AppError::api(
            ErrorKind::UnknownSymbol,
            q.symbol.to_string(),
        ));
    }
    let mut histories = state.histories.write().await;
    let history = histories.get_mut(&q.symbol).ok_or_else(|| {
        AppError::api(ErrorKind::UnknownSymbol, q.symbol.to_string())
    })?;
    let latest = history
        .query(None, None, 1)
        .pop()
        .ok_or_else(|| AppError::api(ErrorKind::NotFound, "no ticks published yet"))?;
    let volume_24h = history.volume_24h(Utc::now());
    Ok(Json(TickerResponse {
        symbol: q.symbol,
        price: latest.price,
        bid: latest.bid,
        ask: latest.ask,
        volume_24h,
        timestamp: latest.timestamp,
    }))
}

#[derive(Deserialize)]
pub struct PricesQuery {
    symbol: Symbol,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct PricesResponse {
    symbol: Symbol,
    prices: Vec<crate::marketdata::PricePoint>,
}

pub async fn prices(
    State(state): State<AppState>,
    Query(q): Query<PricesQuery>,
) -> Result<Json<PricesResponse>, AppError> {
    use crate::marketdata::history::DEFAULT_PRICES_LIMIT;

    let mut histories = state.histories.write().await;
    let history = histories
        .get_mut(&q.symbol)
        .ok_or_else(|| AppError::api(ErrorKind::UnknownSymbol, q.symbol.to_string()))?;
    let prices = history.query(q.start, q.end, q.limit.unwrap_or(DEFAULT_PRICES_LIMIT));
    Ok(Json(PricesResponse {
        symbol: q.symbol,
        prices,
    }))
}

#[derive(Serialize)]
pub struct FillSummary {
    price: Decimal,
    quantity: Decimal,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderAck {
    order: Order,
    fills: Vec<FillSummary>,
}

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderAck>), AppError> {
    let session_id = session_of(&headers);
    let (order, fills) = state.ctx.engine.place_order(session_id, req).await?;
    let fills = fills
        .into_iter()
        .map(|f| FillSummary {
            price: f.price,
            quantity: f.quantity,
            timestamp: f.timestamp,
        })
        .collect();
    Ok((StatusCode::CREATED, Json(OrderAck { order, fills })))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let session_id = session_of(&headers);
    let order = state.ctx.engine.get_order(session_id, order_id).await?;
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    symbol: Option<Symbol>,
    status: Option<OrderStatus>,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    orders: Vec<Order>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListOrdersQuery>,
) -> Json<OrdersResponse> {
    let session_id = session_of(&headers);
    let orders = state
        .ctx
        .engine
        .list_orders(
            session_id,
            OrderFilter {
                symbol: q.symbol,
                status: q.status,
            },
        )
        .await;
    Json(OrdersResponse { orders })
}

#[derive(Serialize)]
pub struct CancelResponse {
    status: &'static str,
}

pub async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let session_id = session_of(&headers);
    state.ctx.engine.cancel_order(session_id, order_id).await?;
    Ok(Json(CancelResponse { status: "cancelled" }))
}

#[derive(Serialize)]
pub struct BalanceResponse {
    balances: HashMap<String, crate::money::Balance>,
}

pub async fn balance(State(state): State<AppState>, headers: HeaderMap) -> Json<BalanceResponse> {
    let session_id = session_of(&headers);
    let balances = state
        .ctx
        .engine
        .balance(session_id)
        .await
        .into_iter()
        .map(|(asset, bal)| (asset.to_string(), bal))
        .collect();
    Json(BalanceResponse { balances })
}

#[derive(Deserialize)]
pub struct PositionQuery {
    symbol: String,
}

pub async fn position(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PositionQuery>,
) -> Json<crate::money::Balance> {
    let session_id = session_of(&headers);
    Json(state.ctx.engine.position(session_id, q.symbol).await)
}

#[derive(Serialize)]
pub struct StrategyReport {
    name: &'static str,
    stats: StrategyStats,
}

#[derive(Serialize)]
pub struct FailuresResponse {
    strategies: Vec<StrategyReport>,
}

pub async fn admin_failures(State(state): State<AppState>) -> Json<FailuresResponse> {
    let strategies = state
        .ctx
        .failures
        .report()
        .into_iter()
        .map(|(name, stats)| StrategyReport { name, stats })
        .collect();
    Json(FailuresResponse { strategies })
}
