//! Price-time priority order book: bids iterated high-to-low, asks
//! iterated low-to-high, FIFO within a price level.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::types::{Order, Side};

/// One side of the book: price → FIFO queue of resting order ids, plus the
/// map from order id to its position so cancel is O(log n) instead of a
/// linear scan.
#[derive(Debug, Default)]
struct Side_ {
    levels: BTreeMap<Decimal, VecDeque<Uuid>>,
}

impl Side_ {
    fn push(&mut self, price: Decimal, order_id: Uuid) {
        self.levels.entry(price).or_default().push_back(order_id);
    }

    fn remove(&mut self, price: Decimal, order_id: Uuid) {
        if let Some(queue) = self.levels.get_mut(&price) {
            queue.retain(|id| *id != order_id);
            if queue.is_empty() {
                self.levels.remove(&price);
            }
        }
    }
}

/// The order book for a single symbol. Holds only ids and prices; the
/// orders themselves live in the engine's order table so the book doesn't
/// duplicate mutable state.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: Side_,
    asks: Side_,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rest(&mut self, side: Side, price: Decimal, order_id: Uuid) {
        match side {
            Side::Buy => self.bids.push(price, order_id),
            Side::Sell => self.asks.push(price, order_id),
        }
    }

    pub fn remove(&mut self, side: Side, price: Decimal, order_id: Uuid) {
        match side {
            Side::Buy => self.bids.remove(price, order_id),
            Side::Sell => self.asks.remove(price, order_id),
        }
    }

    /// Best price and the id of the order at the front of its FIFO queue,
    /// for the side opposite `taker_side`.
    pub fn top(&self, taker_side: Side) -> Option<(Decimal, Uuid)> {
        match taker_side {
            // A buy matches against the lowest ask.
            Side::Buy => self
                .asks
                .levels
                .iter()
                .next()
                .and_then(|(price, q)| q.front().map(|id| (*price, *id))),
            // A sell matches against the highest bid.
            Side::Sell => self
                .bids
                .levels
                .iter()
                .next_back()
                .and_then(|(price, q)| q.front().map(|id| (*price, *id))),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.levels.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.levels.keys().next().copied()
    }

    /// Ask levels in ascending price order, for a FOK depth walk.
    pub fn ask_levels(&self) -> impl Iterator<Item = (&Decimal, &VecDeque<Uuid>)> {
        self.asks.levels.iter()
    }

    /// Bid levels in descending price order, for a FOK depth walk.
    pub fn bid_levels(&self) -> impl Iterator<Item = (&Decimal, &VecDeque<Uuid>)> {
        self.bids.levels.iter().rev()
    }

    /// Total remaining quantity resting at `price` on `side`, computed from
    /// the supplied order lookup (the book itself only stores ids).
    pub fn depth_at<'a>(
        &self,
        side: Side,
        price: Decimal,
        orders: impl Fn(Uuid) -> Option<&'a Order>,
    ) -> Decimal {
        let queue = match side {
            Side::Buy => self.bids.levels.get(&price),
            Side::Sell => self.asks.levels.get(&price),
        };
        queue
            .into_iter()
            .flatten()
            .filter_map(|id| orders(*id).map(|o| o.remaining()))
            .sum()
    }

    pub fn is_empty_side(&self, side: Side) -> bool {
        match side {
            Side::Buy => self.bids.levels.is_empty(),
            Side::Sell => self.asks.levels.is_empty(),
        }
    }

    pub fn pop_front(&mut self, side: Side, price: Decimal) {
        let levels = match side {
            Side::Buy => &mut self.bids.levels,
            Side::Sell => &mut self.asks.levels,
        };
        if let Some(queue) = levels.get_mut(&price) {
            queue.pop_front();
            if queue.is_empty() {
                levels.remove(&price);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn test_best_bid_ask_empty() {
        let book = OrderBook::new();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_bids_iterate_high_to_low() {
        let mut book = OrderBook::new();
        book.rest(Side::Buy, Decimal::new(100, 0), uid(1));
        book.rest(Side::Buy, Decimal::new(105, 0), uid(2));
        book.rest(Side::Buy, Decimal::new(99, 0), uid(3));
        assert_eq!(book.best_bid(), Some(Decimal::new(105, 0)));
        let (price, id) = book.top(Side::Sell).unwrap();
        assert_eq!(price, Decimal::new(105, 0));
        assert_eq!(id, uid(2));
    }

    #[test]
    fn test_asks_iterate_low_to_high() {
        let mut book = OrderBook::new();
        book.rest(Side::Sell, Decimal::new(100, 0), uid(1));
        book.rest(Side::Sell, Decimal::new(95, 0), uid(2));
        assert_eq!(book.best_ask(), Some(Decimal::new(95, 0)));
        let (price, id) = book.top(Side::Buy).unwrap();
        assert_eq!(price, Decimal::new(95, 0));
        assert_eq!(id, uid(2));
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = OrderBook::new();
        book.rest(Side::Buy, Decimal::new(100, 0), uid(1));
        book.rest(Side::Buy, Decimal::new(100, 0), uid(2));
        let (_, front) = book.top(Side::Sell).unwrap();
        assert_eq!(front, uid(1));
        book.pop_front(Side::Buy, Decimal::new(100, 0));
        let (_, front) = book.top(Side::Sell).unwrap();
        assert_eq!(front, uid(2));
    }

    #[test]
    fn test_remove_empties_level() {
        let mut book = OrderBook::new();
        book.rest(Side::Buy, Decimal::new(100, 0), uid(1));
        book.remove(Side::Buy, Decimal::new(100, 0), uid(1));
        assert_eq!(book.best_bid(), None);
        assert!(book.is_empty_side(Side::Buy));
    }
}
