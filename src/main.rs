//! Exchange simulator — entry point.
//!
//! Orchestrates:
//! 1. Config + logging initialization
//! 2. The engine actor (owns books + accounts)
//! 3. The market-data publisher (price model, ticks, rolling history)
//! 4. The failure injection chains
//! 5. Background fan-out tasks (maker fills, market data)
//! 6. The axum HTTP/WebSocket server
//! 7. Ctrl+C graceful shutdown

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use exchange_sim::config::{init_logging, load_config};
use exchange_sim::engine::actor::EngineHandle;
use exchange_sim::engine::{Engine, NoLiquidityBehavior};
use exchange_sim::failure::FailureChains;
use exchange_sim::handlers::HandlerContext;
use exchange_sim::marketdata::MarketDataPublisher;
use exchange_sim::server::{self, fill_router, market_fanout, AppState};
use exchange_sim::session::SessionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    info!("=== exchange simulator ===");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = match load_config(Path::new(&config_path)) {
        Ok(config) => {
            info!(path = %config_path, "config loaded");
            config
        }
        Err(e) => {
            warn!(error = %e, path = %config_path, "failed to load config, using built-in defaults");
            exchange_sim::config::AppConfig::default()
        }
    };

    let mut default_balance = HashMap::new();
    for (asset, amount) in &config.exchange.default_balance {
        default_balance.insert(Arc::from(asset.as_str()), *amount);
    }
    let engine = Engine::new(
        config.exchange.symbols.clone(),
        default_balance,
        NoLiquidityBehavior::Reject,
    );
    let (engine_handle, fill_tx) = EngineHandle::spawn(engine);

    let publisher = MarketDataPublisher::new(&config.exchange);
    let (market_tx, histories) = publisher.spawn(fill_tx.subscribe());

    let failures = Arc::new(FailureChains::from_config(&config.failures));
    let sessions = SessionManager::new();

    let ctx = HandlerContext {
        engine: engine_handle,
        sessions,
        failures,
    };

    tokio::spawn(fill_router::run(ctx.clone(), fill_tx.subscribe()));
    tokio::spawn(market_fanout::run(ctx.clone(), market_tx.subscribe()));

    let state = AppState {
        ctx,
        market_tx,
        histories,
    };

    let host = config.server.host.clone();
    let port = config.server.port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(state, &host, port).await {
            error!(error = %e, "server failed");
        }
    });

    info!(
        host = %config.server.host,
        port = config.server.port,
        "exchange simulator running; press Ctrl+C to shut down"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    server_handle.abort();

    info!("=== shutdown complete ===");
    Ok(())
}
