//! Per-symbol ticker task: advances the price model, derives bid/ask,
//! assigns sequence ids, and broadcasts to whoever is subscribed (spec
//! §4.3). Fills observed from the engine feed the rolling volume.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use crate::config::ExchangeConfig;
use crate::engine::{Fill, Side};
use crate::money::Symbol;

use super::history::{PriceHistory, DEFAULT_HISTORY_CAPACITY};
use super::price_model::{GbmModel, PriceModel};
use super::types::MarketDataTick;

/// An anonymized trade, broadcast on the public `TRADES` channel (spec §4.1
/// observable side effects, §6.2 `TRADE` frame).
#[derive(Debug, Clone)]
pub struct TradeEvent {
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub aggressor_side: Side,
}

#[derive(Debug, Clone)]
pub enum MarketEvent {
    Tick(MarketDataTick),
    Trade(TradeEvent),
}

/// Broadcast channel capacity. Sized for bursty subscriber fan-out; a lagged
/// receiver only loses market data, which clients already tolerate (spec §5
/// ordering guarantees).
const EVENT_CHANNEL_CAPACITY: usize = 4096;

struct SymbolState {
    model: Box<dyn PriceModel>,
    price: Decimal,
    spread_bps: u32,
    sequence: u64,
}

/// Shared, lockable history store so REST handlers can serve `GET
/// /api/v1/prices` without going through the publisher task.
pub type SharedHistories = Arc<RwLock<HashMap<Symbol, PriceHistory>>>;

pub struct MarketDataPublisher {
    tick_interval_ms: u64,
    symbols: HashMap<Symbol, SymbolState>,
}

impl MarketDataPublisher {
    pub fn new(config: &ExchangeConfig) -> Self {
        let mut symbols = HashMap::new();
        for symbol in &config.symbols {
            let initial = config
                .initial_prices
                .get(&symbol.to_string())
                .copied()
                .unwrap_or(Decimal::new(100, 0));
            let model = GbmModel::new(config.pricing_model.drift, config.pricing_model.volatility);
            symbols.insert(
                symbol.clone(),
                SymbolState {
                    model: Box::new(model),
                    price: initial,
                    spread_bps: config.spread_bps,
                    sequence: 0,
                },
            );
        }
        Self {
            tick_interval_ms: config.tick_interval_ms,
            symbols,
        }
    }

    /// Spawns the ticker loop and a fill-consumer loop. `fill_rx` is this
    /// publisher's own subscription to the engine's fill broadcast — other
    /// subscribers (e.g. per-session fill routing) get their own via
    /// `EngineHandle`'s broadcast sender. Returns a broadcast sender
    /// subscribers use to receive ticks and trades, plus the shared history
    /// store REST handlers read from.
    pub fn spawn(
        mut self,
        mut fill_rx: broadcast::Receiver<Fill>,
    ) -> (broadcast::Sender<MarketEvent>, SharedHistories) {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let tick_interval = self.tick_interval_ms;

        let histories: SharedHistories = Arc::new(RwLock::new(HashMap::new()));
        for symbol in self.symbols.keys() {
            histories
                .try_write()
                .expect("uncontended at startup")
                .insert(symbol.clone(), PriceHistory::new(DEFAULT_HISTORY_CAPACITY));
        }

        let fill_histories = histories.clone();
        let fill_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                let fill = match fill_rx.recv().await {
                    Ok(fill) => fill,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "market data publisher lagged on fill feed");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let mut guard = fill_histories.write().await;
                if let Some(history) = guard.get_mut(&fill.symbol) {
                    history.record_trade(fill.timestamp, fill.quantity);
                }
                drop(guard);
                let _ = fill_tx.send(MarketEvent::Trade(TradeEvent {
                    symbol: fill.symbol,
                    price: fill.price,
                    quantity: fill.quantity,
                    timestamp: fill.timestamp,
                    aggressor_side: fill.aggressor_side,
                }));
            }
        });

        let tick_tx = tx.clone();
        let tick_histories = histories.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(tick_interval));
            info!(tick_interval_ms = tick_interval, "market data publisher started");
            loop {
                interval.tick().await;
                for (symbol, state) in self.symbols.iter_mut() {
                    state.price = state.model.next_price(state.price, tick_interval);
                    let spread = state.price * Decimal::new(state.spread_bps as i64, 4);
                    let bid = state.price - spread / Decimal::new(2, 0);
                    let ask = state.price + spread / Decimal::new(2, 0);
                    state.sequence += 1;

                    let now = chrono::Utc::now();
                    let volume_24h = {
                        let mut guard = tick_histories.write().await;
                        guard
                            .get_mut(symbol)
                            .map(|h| h.volume_24h(now))
                            .unwrap_or(Decimal::ZERO)
                    };

                    let tick = MarketDataTick {
                        symbol: symbol.clone(),
                        sequence_id: state.sequence,
                        timestamp: now,
                        price: state.price,
                        bid,
                        ask,
                        volume_24h,
                    };

                    {
                        let mut guard = tick_histories.write().await;
                        if let Some(h) = guard.get_mut(symbol) {
                            h.push_tick(&tick);
                        }
                    }

                    let _ = tick_tx.send(MarketEvent::Tick(tick));
                }
            }
        });

        (tx, histories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;

    #[tokio::test]
    async fn test_publisher_emits_ticks_for_each_configured_symbol() {
        let mut config = ExchangeConfig::default();
        config.tick_interval_ms = 10;
        let publisher = MarketDataPublisher::new(&config);
        let (_fill_tx, fill_rx) = broadcast::channel(16);
        let (tx, _histories) = publisher.spawn(fill_rx);
        let mut rx = tx.subscribe();

        let event = tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out waiting for a tick")
            .unwrap();
        match event {
            MarketEvent::Tick(tick) => assert_eq!(tick.sequence_id, 1),
            MarketEvent::Trade(_) => panic!("expected a tick before any trade"),
        }
    }

    #[tokio::test]
    async fn test_fill_updates_volume_and_emits_trade() {
        let mut config = ExchangeConfig::default();
        config.tick_interval_ms = 5_000;
        let publisher = MarketDataPublisher::new(&config);
        let (fill_tx, fill_rx) = broadcast::channel(16);
        let (tx, histories) = publisher.spawn(fill_rx);
        let mut rx = tx.subscribe();

        let symbol = Symbol::new("BTC", "USD");
        fill_tx
            .send(Fill {
                symbol: symbol.clone(),
                price: Decimal::new(50_000, 0),
                quantity: Decimal::new(2, 0),
                timestamp: chrono::Utc::now(),
                maker_order_id: uuid::Uuid::new_v4(),
                taker_order_id: uuid::Uuid::new_v4(),
                maker_session: "alice".into(),
                taker_session: "bob".into(),
                aggressor_side: Side::Buy,
            })
            .unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out waiting for a trade")
            .unwrap();
        assert!(matches!(event, MarketEvent::Trade(_)));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let mut guard = histories.write().await;
        let volume = guard.get_mut(&symbol).unwrap().volume_24h(chrono::Utc::now());
        assert_eq!(volume, Decimal::new(2, 0));
    }
}
