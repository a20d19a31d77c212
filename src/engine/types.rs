//! Order, fill, and error types shared by the book, the matcher, and the
//! engine actor's public command surface.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::money::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A client-submitted request to place an order, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
}

/// A live or terminal order, as tracked by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: Uuid,
    pub session_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonic arrival counter, used to break ties at the same price level.
    pub sequence: u64,
}

impl Order {
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Price at which this order reserved quote on admission (the limit
    /// price), or `None` for a MARKET order, which reserves nothing up
    /// front.
    pub fn reservation_price(&self) -> Option<Decimal> {
        self.price
    }
}

/// One matched trade, reported once per matched pair.
#[derive(Debug, Clone, Serialize)]
pub struct Fill {
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_session: String,
    pub taker_session: String,
    pub aggressor_side: Side,
}

/// Engine error kinds, per spec §4.1 / §7. Each variant maps to exactly one
/// [`ErrorKind`].
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("order cannot be filled immediately (FOK): {0}")]
    FokUnfillable(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnknownSymbol(_) => ErrorKind::UnknownSymbol,
            EngineError::InvalidOrder(_) => ErrorKind::InvalidOrder,
            EngineError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::FokUnfillable(_) => ErrorKind::FokUnfillable,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Whether a fully-unfilled MARKET/IOC order with no opposing liquidity is
/// rejected outright or accepted as an empty fill. See SPEC_FULL.md §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoLiquidityBehavior {
    Reject,
    EmptyFill,
}

impl Default for NoLiquidityBehavior {
    fn default() -> Self {
        NoLiquidityBehavior::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_order_status_is_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Open.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_engine_error_kind_mapping() {
        assert_eq!(
            EngineError::NotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::FokUnfillable("x".into()).kind(),
            ErrorKind::FokUnfillable
        );
    }
}
