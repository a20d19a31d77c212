//! HTTP + WebSocket API server (spec §6). `axum` for routing, with the
//! engine/session/failure state shared through [`HandlerContext`].

pub mod fill_router;
pub mod market_fanout;
pub mod rest;
pub mod ws;

use axum::extract::{Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{AppError, ErrorKind};
use crate::failure::RateLimitDecision;
use crate::handlers::HandlerContext;
use crate::marketdata::SharedHistories;
use crate::session::DEFAULT_REST_SESSION;

/// Shared application state for every route handler.
#[derive(Clone)]
pub struct AppState {
    pub ctx: HandlerContext,
    pub market_tx: tokio::sync::broadcast::Sender<crate::marketdata::MarketEvent>,
    pub histories: SharedHistories,
}

/// Delivers one already-wire-encoded message through `ctx`'s outbound
/// failure chain and on to `session_id`'s queue. Spawned per message so a
/// `Delayed` outcome on one session never blocks delivery to another.
pub async fn deliver_outbound(ctx: HandlerContext, session_id: String, wire: String) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    ctx.failures.outbound.process(wire, &session_id, tx);
    while let Some(msg) = rx.recv().await {
        ctx.sessions.send_to(&session_id, msg).await;
    }
}

/// Gates every `/api/v1/*` request behind the REST rate limiter (spec
/// §4.2 strategy 8); `/health` and `/ws` are exempt.
async fn rate_limit_mw(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let session_id = req
        .headers()
        .get("X-Session-ID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_REST_SESSION)
        .to_string();

    match state.ctx.failures.rate_limit.check(&session_id) {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Limited { retry_after_secs, .. } => {
            let mut response = AppError::api(ErrorKind::RateLimited, "rate limit exceeded").into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/symbols", get(rest::symbols))
        .route("/ticker", get(rest::ticker))
        .route("/prices", get(rest::prices))
        .route("/orders", post(rest::place_order).get(rest::list_orders))
        .route("/orders/:id", get(rest::get_order).delete(rest::cancel_order))
        .route("/balance", get(rest::balance))
        .route("/position", get(rest::position))
        .route("/admin/failures", get(rest::admin_failures))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_mw));

    Router::new()
        .route("/health", get(rest::health))
        .nest("/api/v1", api)
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the router. Blocks until the server shuts down.
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    info!(address = %addr, "starting exchange simulator server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
