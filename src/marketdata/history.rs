//! Bounded rolling price history plus the trailing-24h volume accumulator
//! (spec §4.3).

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::types::{MarketDataTick, PricePoint};

/// Default and maximum size of the per-symbol price history ring (spec §4.3,
/// `GET /api/v1/prices`).
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;
pub const DEFAULT_PRICES_LIMIT: usize = 500;
pub const MAX_PRICES_LIMIT: usize = 10_000;

/// One minute's worth of traded quantity, for the trailing-24h ring.
struct VolumeBucket {
    minute: i64,
    quantity: Decimal,
}

/// Per-symbol price history and rolling 24h traded volume.
pub struct PriceHistory {
    capacity: usize,
    points: VecDeque<PricePoint>,
    volume_buckets: VecDeque<VolumeBucket>,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity.min(1024)),
            volume_buckets: VecDeque::new(),
        }
    }

    pub fn push_tick(&mut self, tick: &MarketDataTick) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(tick.into());
    }

    /// Record traded quantity at `at`, bucketed by minute.
    pub fn record_trade(&mut self, at: DateTime<Utc>, quantity: Decimal) {
        let minute = at.timestamp() / 60;
        match self.volume_buckets.back_mut() {
            Some(bucket) if bucket.minute == minute => bucket.quantity += quantity,
            _ => self.volume_buckets.push_back(VolumeBucket { minute, quantity }),
        }
    }

    /// Sum of traded quantity in the trailing 24 hours as of `now`, evicting
    /// buckets that have aged out.
    pub fn volume_24h(&mut self, now: DateTime<Utc>) -> Decimal {
        let cutoff = (now - Duration::hours(24)).timestamp() / 60;
        while matches!(self.volume_buckets.front(), Some(b) if b.minute < cutoff) {
            self.volume_buckets.pop_front();
        }
        self.volume_buckets.iter().map(|b| b.quantity).sum()
    }

    /// Entries within `[start, end]` (either bound optional), newest last,
    /// truncated to at most `limit` entries.
    pub fn query(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<PricePoint> {
        let limit = limit.min(MAX_PRICES_LIMIT).max(1);
        let filtered: Vec<PricePoint> = self
            .points
            .iter()
            .filter(|p| start.map_or(true, |s| p.timestamp >= s))
            .filter(|p| end.map_or(true, |e| p.timestamp <= e))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered[skip..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Symbol;

    fn tick(seq: u64, price: i64, at: DateTime<Utc>) -> MarketDataTick {
        MarketDataTick {
            symbol: Symbol::new("BTC", "USD"),
            sequence_id: seq,
            timestamp: at,
            price: Decimal::new(price, 0),
            bid: Decimal::new(price - 1, 0),
            ask: Decimal::new(price + 1, 0),
            volume_24h: Decimal::ZERO,
        }
    }

    #[test]
    fn test_bounded_capacity_evicts_oldest() {
        let mut history = PriceHistory::new(3);
        let now = Utc::now();
        for i in 0..5 {
            history.push_tick(&tick(i, 100 + i as i64, now));
        }
        assert_eq!(history.len(), 3);
        let all = history.query(None, None, 10);
        assert_eq!(all.first().unwrap().price, Decimal::new(102, 0));
    }

    #[test]
    fn test_query_respects_limit_and_keeps_newest() {
        let mut history = PriceHistory::new(100);
        let now = Utc::now();
        for i in 0..10 {
            history.push_tick(&tick(i, 100 + i as i64, now));
        }
        let last_three = history.query(None, None, 3);
        assert_eq!(last_three.len(), 3);
        assert_eq!(last_three.last().unwrap().price, Decimal::new(109, 0));
    }

    #[test]
    fn test_volume_24h_sums_buckets_and_expires_old() {
        let mut history = PriceHistory::new(100);
        let now = Utc::now();
        history.record_trade(now - Duration::hours(30), Decimal::new(5, 0));
        history.record_trade(now - Duration::hours(1), Decimal::new(2, 0));
        history.record_trade(now, Decimal::new(3, 0));
        assert_eq!(history.volume_24h(now), Decimal::new(5, 0));
    }

    #[test]
    fn test_volume_24h_zero_with_no_trades() {
        let mut history = PriceHistory::new(100);
        assert_eq!(history.volume_24h(Utc::now()), Decimal::ZERO);
    }
}
