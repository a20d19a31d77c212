//! The exchange engine: order book, accounts, and the matching algorithm
//! that ties them together (spec §4.1).
//!
//! `Engine` itself is a plain, non-async struct with no locking of its own —
//! see [`actor`] for the single-owner task that gives it exclusivity per
//! spec §5. Keeping the two separate means the matching logic can be unit
//! tested synchronously, as the tests in [`matcher`] do.

pub mod account;
pub mod actor;
pub mod book;
pub mod matcher;
pub mod types;

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

pub use types::{
    EngineError, EngineResult, Fill, NoLiquidityBehavior, Order, OrderStatus, OrderType,
    PlaceOrderRequest, Side, TimeInForce,
};

use account::Account;
use book::OrderBook;
use crate::money::{self, Balance, Symbol};

/// Filter for `list_orders`.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub symbol: Option<Symbol>,
    pub status: Option<OrderStatus>,
}

pub struct Engine {
    books: HashMap<Symbol, OrderBook>,
    orders: HashMap<Uuid, Order>,
    /// Orders grouped by session, newest last, for `list_orders`.
    orders_by_session: HashMap<String, Vec<Uuid>>,
    accounts: HashMap<String, Account>,
    sequence: u64,
    default_balance: HashMap<money::Asset, Decimal>,
    no_liquidity: NoLiquidityBehavior,
}

impl Engine {
    pub fn new(
        symbols: impl IntoIterator<Item = Symbol>,
        default_balance: HashMap<money::Asset, Decimal>,
        no_liquidity: NoLiquidityBehavior,
    ) -> Self {
        let mut books = HashMap::new();
        for symbol in symbols {
            books.insert(symbol, OrderBook::new());
        }
        Self {
            books,
            orders: HashMap::new(),
            orders_by_session: HashMap::new(),
            accounts: HashMap::new(),
            sequence: 0,
            default_balance,
            no_liquidity,
        }
    }

    pub fn has_symbol(&self, symbol: &Symbol) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.books.keys()
    }

    /// Returns the session's account, creating it with the configured
    /// default balances on first touch (spec §4.4 expansion).
    fn account_mut(&mut self, session_id: &str) -> &mut Account {
        if !self.accounts.contains_key(session_id) {
            let mut acc = Account::new();
            for (asset, amount) in &self.default_balance {
                acc.grant(asset.clone(), *amount);
            }
            self.accounts.insert(session_id.to_string(), acc);
        }
        self.accounts.get_mut(session_id).unwrap()
    }

    pub fn balance(&mut self, session_id: &str) -> HashMap<money::Asset, Balance> {
        self.account_mut(session_id).balances().clone()
    }

    pub fn position(&mut self, session_id: &str, asset: &str) -> Balance {
        self.account_mut(session_id).balance(asset)
    }

    fn validate(&self, req: &PlaceOrderRequest) -> EngineResult<()> {
        if !self.has_symbol(&req.symbol) {
            return Err(EngineError::UnknownSymbol(req.symbol.to_string()));
        }
        if req.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder("quantity must be > 0".into()));
        }
        match req.order_type {
            OrderType::Limit => {
                let Some(price) = req.price else {
                    return Err(EngineError::InvalidOrder(
                        "LIMIT order requires a price".into(),
                    ));
                };
                if price <= Decimal::ZERO {
                    return Err(EngineError::InvalidOrder("price must be > 0".into()));
                }
                if req.time_in_force == Some(TimeInForce::Fok) && req.quantity <= Decimal::ZERO {
                    return Err(EngineError::InvalidOrder("quantity must be > 0".into()));
                }
            }
            OrderType::Market => {
                if req.price.is_some() {
                    return Err(EngineError::InvalidOrder(
                        "MARKET order must not specify a price".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn place_order(
        &mut self,
        session_id: &str,
        req: PlaceOrderRequest,
    ) -> EngineResult<(Order, Vec<Fill>)> {
        self.validate(&req)?;

        let side = req.side;
        let reserve_asset = match side {
            Side::Buy => req.symbol.quote.clone(),
            Side::Sell => req.symbol.base.clone(),
        };
        let reserve_amount = match (side, req.order_type) {
            (Side::Buy, OrderType::Limit) => req.price.unwrap() * req.quantity,
            (Side::Buy, OrderType::Market) => self.market_buy_worst_case(&req)?,
            (Side::Sell, _) => req.quantity,
        };

        self.account_mut(session_id)
            .reserve(&reserve_asset, reserve_amount)?;

        self.sequence += 1;
        let now = Utc::now();
        let mut order = Order {
            order_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            symbol: req.symbol.clone(),
            side,
            order_type: req.order_type,
            price: req.price,
            quantity: req.quantity,
            filled_quantity: Decimal::ZERO,
            time_in_force: req
                .time_in_force
                .unwrap_or(if req.order_type == OrderType::Market {
                    TimeInForce::Ioc
                } else {
                    TimeInForce::Gtc
                }),
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
            sequence: self.sequence,
        };

        let book = self.books.get_mut(&req.symbol).unwrap();
        let result = matcher::match_order(
            book,
            &mut self.orders,
            &mut self.accounts,
            &mut order,
            self.no_liquidity,
        );

        let fills = match result {
            Ok(fills) => fills,
            Err(e) => {
                // FOK rejection: undo the reservation, the order never existed.
                self.account_mut(session_id).release(&reserve_asset, reserve_amount);
                return Err(e);
            }
        };

        // Release any reservation no longer needed: a SELL always consumed
        // exactly `quantity` base regardless of fill path (nothing to
        // release); a BUY that rested or was cancelled/rejected may still
        // hold a reservation for its unfilled remainder.
        if order.status.is_terminal() && order.status != OrderStatus::Filled {
            let remaining = order.remaining();
            if remaining > Decimal::ZERO {
                let refund = match side {
                    Side::Buy => order.price.map(|p| p * remaining).unwrap_or(Decimal::ZERO),
                    Side::Sell => remaining,
                };
                if refund > Decimal::ZERO {
                    self.account_mut(session_id).release(&reserve_asset, refund);
                }
            }
        }

        self.orders_by_session
            .entry(session_id.to_string())
            .or_default()
            .push(order.order_id);
        self.orders.insert(order.order_id, order.clone());

        Ok((order, fills))
    }

    /// Worst-case quote cost of a BUY MARKET order: walks the ask side to
    /// the depth needed to fill `quantity`, summing `price*qty` per level,
    /// and fails fast if the free balance can't cover it even optimistically.
    fn market_buy_worst_case(&self, req: &PlaceOrderRequest) -> EngineResult<Decimal> {
        let book = self.books.get(&req.symbol).unwrap();
        let mut remaining = req.quantity;
        let mut cost = Decimal::ZERO;
        for (&price, queue) in book.ask_levels() {
            if remaining == Decimal::ZERO {
                break;
            }
            for id in queue {
                if remaining == Decimal::ZERO {
                    break;
                }
                let avail = self.orders.get(id).map(|o| o.remaining()).unwrap_or_default();
                let take = remaining.min(avail);
                cost += take * price;
                remaining -= take;
            }
        }
        Ok(cost)
    }

    pub fn cancel_order(&mut self, session_id: &str, order_id: Uuid) -> EngineResult<Order> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or_else(|| EngineError::NotFound(order_id.to_string()))?;

        if order.session_id != session_id {
            return Err(EngineError::Forbidden(
                "order belongs to another session".into(),
            ));
        }
        if order.status.is_terminal() {
            return Err(EngineError::NotFound(format!(
                "order {} is already terminal",
                order_id
            )));
        }

        let symbol = order.symbol.clone();
        let side = order.side;
        let price = order.price.unwrap();
        let remaining = order.remaining();

        let book = self.books.get_mut(&symbol).unwrap();
        book.remove(side, price, order_id);

        let refund_asset = match side {
            Side::Buy => symbol.quote.clone(),
            Side::Sell => symbol.base.clone(),
        };
        let refund_amount = match side {
            Side::Buy => price * remaining,
            Side::Sell => remaining,
        };
        self.account_mut(session_id)
            .release(&refund_asset, refund_amount);

        let order = self.orders.get_mut(&order_id).unwrap();
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    pub fn get_order(&self, session_id: &str, order_id: Uuid) -> EngineResult<Order> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or_else(|| EngineError::NotFound(order_id.to_string()))?;
        if order.session_id != session_id {
            return Err(EngineError::Forbidden(
                "order belongs to another session".into(),
            ));
        }
        Ok(order.clone())
    }

    pub fn list_orders(&self, session_id: &str, filter: OrderFilter) -> Vec<Order> {
        self.orders_by_session
            .get(session_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .filter(|o| filter.symbol.as_ref().map_or(true, |s| &o.symbol == s))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect()
    }

    pub fn best_bid_ask(&self, symbol: &Symbol) -> Option<(Option<Decimal>, Option<Decimal>)> {
        self.books
            .get(symbol)
            .map(|b| (b.best_bid(), b.best_ask()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn engine() -> Engine {
        let mut default_balance = HashMap::new();
        default_balance.insert(Arc::from("USD"), Decimal::new(100_000, 0));
        default_balance.insert(Arc::from("BTC"), Decimal::new(10, 0));
        Engine::new(
            [Symbol::new("BTC", "USD")],
            default_balance,
            NoLiquidityBehavior::Reject,
        )
    }

    #[test]
    fn test_reject_unknown_symbol() {
        let mut eng = engine();
        let req = PlaceOrderRequest {
            symbol: Symbol::new("ETH", "USD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(100, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        let err = eng.place_order("alice", req).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSymbol(_)));
    }

    #[test]
    fn test_reject_insufficient_balance_and_releases_nothing() {
        let mut eng = engine();
        let req = PlaceOrderRequest {
            symbol: Symbol::new("BTC", "USD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(1_000_000, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        let err = eng.place_order("alice", req).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance(_)));
        assert_eq!(
            eng.balance("alice")[&Arc::from("USD")].free,
            Decimal::new(100_000, 0)
        );
    }

    #[test]
    fn test_place_and_cancel_releases_reservation() {
        let mut eng = engine();
        let req = PlaceOrderRequest {
            symbol: Symbol::new("BTC", "USD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(50_000, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        let (order, fills) = eng.place_order("alice", req).unwrap();
        assert!(fills.is_empty());
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(
            eng.balance("alice")[&Arc::from("USD")].locked,
            Decimal::new(50_000, 0)
        );

        eng.cancel_order("alice", order.order_id).unwrap();
        assert_eq!(
            eng.balance("alice")[&Arc::from("USD")].free,
            Decimal::new(100_000, 0)
        );
        assert_eq!(
            eng.balance("alice")[&Arc::from("USD")].locked,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_cancel_foreign_session_forbidden() {
        let mut eng = engine();
        let req = PlaceOrderRequest {
            symbol: Symbol::new("BTC", "USD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(50_000, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        let (order, _) = eng.place_order("alice", req).unwrap();
        let err = eng.cancel_order("bob", order.order_id).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn test_cancel_unknown_order_not_found() {
        let mut eng = engine();
        let err = eng.cancel_order("alice", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_full_match_conserves_totals() {
        let mut eng = engine();
        let sell = PlaceOrderRequest {
            symbol: Symbol::new("BTC", "USD"),
            side: Side::Sell,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(50_000, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        eng.place_order("alice", sell).unwrap();

        let buy = PlaceOrderRequest {
            symbol: Symbol::new("BTC", "USD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Decimal::new(50_000, 0)),
            quantity: Decimal::new(1, 0),
            time_in_force: None,
        };
        let (order, fills) = eng.place_order("bob", buy).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(order.status, OrderStatus::Filled);

        let usd_total = eng.balance("alice")[&Arc::from("USD")].total()
            + eng.balance("bob")[&Arc::from("USD")].total();
        assert_eq!(usd_total, Decimal::new(200_000, 0));
        let btc_total = eng.balance("alice")[&Arc::from("BTC")].total()
            + eng.balance("bob")[&Arc::from("BTC")].total();
        assert_eq!(btc_total, Decimal::new(20, 0));
    }
}
