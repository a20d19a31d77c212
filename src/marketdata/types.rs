//! Wire-facing market-data shapes (spec §4.3, §6.2).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Symbol;

/// One market-data tick, sequenced per `(symbol, channel)` before it enters
/// the outbound failure chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataTick {
    pub symbol: Symbol,
    pub sequence_id: u64,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume_24h: Decimal,
}

/// A single historical price point, as returned by `GET /api/v1/prices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl From<&MarketDataTick> for PricePoint {
    fn from(tick: &MarketDataTick) -> Self {
        Self {
            timestamp: tick.timestamp,
            price: tick.price,
            bid: tick.bid,
            ask: tick.ask,
        }
    }
}

/// The subscribable channels a session can ask for over `/ws` (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Trades,
    Ticker,
    Orderbook,
    MarketData,
}
