//! The price-time priority matching algorithm (spec §4.1).
//!
//! This module is deliberately free of I/O and of knowledge of sessions or
//! the wire protocol: it only mutates a book, an order table, and an
//! account table, and returns the fills it produced. `engine::actor` is the
//! only caller, and it owns all three tables exclusively.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::account::Account;
use crate::engine::book::OrderBook;
use crate::engine::types::{
    EngineError, EngineResult, Fill, NoLiquidityBehavior, Order, OrderStatus, OrderType, Side,
    TimeInForce,
};

/// Runs the matching loop for `incoming` against `book`, mutating resting
/// orders in `orders` and balances in `accounts` as trades settle, and
/// leaving `incoming` in its final disposition (OPEN/PARTIALLY_FILLED on the
/// book, or a terminal status). Returns the fills produced, maker first.
pub fn match_order(
    book: &mut OrderBook,
    orders: &mut HashMap<Uuid, Order>,
    accounts: &mut HashMap<String, Account>,
    incoming: &mut Order,
    no_liquidity: NoLiquidityBehavior,
) -> EngineResult<Vec<Fill>> {
    let base = incoming.symbol.base.clone();
    let quote = incoming.symbol.quote.clone();

    if incoming.time_in_force == TimeInForce::Fok {
        ensure_fully_fillable(book, orders, incoming)?;
    }

    let mut fills = Vec::new();

    while incoming.remaining() > Decimal::ZERO {
        let Some((maker_price, maker_id)) = book.top(incoming.side) else {
            break;
        };

        if incoming.order_type == OrderType::Limit {
            let crosses = match incoming.side {
                Side::Buy => incoming.price.expect("limit order has a price") >= maker_price,
                Side::Sell => incoming.price.expect("limit order has a price") <= maker_price,
            };
            if !crosses {
                break;
            }
        }

        let maker = orders.get(&maker_id).expect("book references a live order");
        let trade_qty = incoming.remaining().min(maker.remaining());
        let trade_price = maker_price;

        settle(
            accounts,
            &base,
            &quote,
            incoming,
            maker_id,
            orders,
            trade_qty,
            trade_price,
        );

        fills.push(Fill {
            symbol: incoming.symbol.clone(),
            price: trade_price,
            quantity: trade_qty,
            timestamp: Utc::now(),
            maker_order_id: maker_id,
            taker_order_id: incoming.order_id,
            maker_session: orders.get(&maker_id).unwrap().session_id.clone(),
            taker_session: incoming.session_id.clone(),
            aggressor_side: incoming.side,
        });

        incoming.filled_quantity += trade_qty;
        incoming.updated_at = Utc::now();

        let maker = orders.get_mut(&maker_id).unwrap();
        maker.filled_quantity += trade_qty;
        maker.updated_at = Utc::now();
        if maker.remaining() == Decimal::ZERO {
            maker.status = OrderStatus::Filled;
            book.pop_front(incoming.side.opposite(), maker_price);
        } else {
            maker.status = OrderStatus::PartiallyFilled;
        }
    }

    dispose(book, incoming, no_liquidity)?;
    Ok(fills)
}

/// Settles one matched trade: moves the taker's reservation into the
/// maker's free balance and vice versa, refunding the taker if its own
/// limit was more aggressive than the maker's resting price.
fn settle(
    accounts: &mut HashMap<String, Account>,
    base: &std::sync::Arc<str>,
    quote: &std::sync::Arc<str>,
    taker: &Order,
    maker_id: Uuid,
    orders: &HashMap<Uuid, Order>,
    qty: Decimal,
    price: Decimal,
) {
    let maker = orders.get(&maker_id).unwrap();
    let (buyer_session, seller_session, buyer_reserved_price) = match taker.side {
        Side::Buy => (
            taker.session_id.clone(),
            maker.session_id.clone(),
            taker.reservation_price(),
        ),
        Side::Sell => (
            maker.session_id.clone(),
            taker.session_id.clone(),
            maker.reservation_price(),
        ),
    };

    let quote_notional = price * qty;
    let buyer_reserved_notional = buyer_reserved_price.unwrap_or(price) * qty;

    let buyer = accounts.entry(buyer_session.clone()).or_default();
    buyer.spend_locked(quote, buyer_reserved_notional);
    buyer.credit(base, qty);
    if let Some(reserved_price) = buyer_reserved_price {
        if reserved_price > price {
            let refund = (reserved_price - price) * qty;
            buyer.credit(quote, refund);
        }
    }

    let seller = accounts.entry(seller_session).or_default();
    seller.spend_locked(base, qty);
    seller.credit(quote, quote_notional);
}

/// FOK pre-check: simulates consuming book depth without mutating anything,
/// and rejects the whole order if it cannot be fully filled immediately.
fn ensure_fully_fillable(
    book: &OrderBook,
    orders: &HashMap<Uuid, Order>,
    incoming: &Order,
) -> EngineResult<()> {
    let mut remaining = incoming.quantity;
    let mut available: Vec<(Decimal, Decimal)> = Vec::new();

    match incoming.side {
        Side::Buy => {
            for (&price, queue) in walk_asks(book) {
                if let Some(limit) = incoming.price {
                    if price > limit {
                        break;
                    }
                }
                for id in queue {
                    if let Some(o) = orders.get(id) {
                        available.push((price, o.remaining()));
                    }
                }
            }
        }
        Side::Sell => {
            for (&price, queue) in walk_bids(book) {
                if let Some(limit) = incoming.price {
                    if price < limit {
                        break;
                    }
                }
                for id in queue {
                    if let Some(o) = orders.get(id) {
                        available.push((price, o.remaining()));
                    }
                }
            }
        }
    }

    for (_, qty) in available {
        if remaining == Decimal::ZERO {
            break;
        }
        remaining -= remaining.min(qty);
    }

    if remaining > Decimal::ZERO {
        return Err(EngineError::FokUnfillable(format!(
            "only able to fill {} of {}",
            incoming.quantity - remaining,
            incoming.quantity
        )));
    }
    Ok(())
}

fn walk_asks(
    book: &OrderBook,
) -> impl Iterator<Item = (&Decimal, &std::collections::VecDeque<Uuid>)> {
    book.ask_levels()
}

fn walk_bids(
    book: &OrderBook,
) -> impl Iterator<Item = (&Decimal, &std::collections::VecDeque<Uuid>)> {
    book.bid_levels()
}

/// Applies the post-match disposition rules to `incoming` (spec §4.1 step 3).
fn dispose(
    book: &mut OrderBook,
    incoming: &mut Order,
    no_liquidity: NoLiquidityBehavior,
) -> EngineResult<()> {
    let fully_filled = incoming.remaining() == Decimal::ZERO;
    incoming.updated_at = Utc::now();

    if fully_filled {
        incoming.status = OrderStatus::Filled;
        return Ok(());
    }

    let nothing_filled = incoming.filled_quantity == Decimal::ZERO;

    match (incoming.order_type, incoming.time_in_force) {
        (OrderType::Market, _) | (OrderType::Limit, TimeInForce::Ioc) => {
            if nothing_filled && no_liquidity == NoLiquidityBehavior::Reject {
                incoming.status = OrderStatus::Rejected;
            } else {
                incoming.status = OrderStatus::Cancelled;
            }
        }
        (OrderType::Limit, TimeInForce::Fok) => {
            // ensure_fully_fillable already rejected unfillable FOK orders
            // before the loop ran, so reaching here with a remainder is a
            // matcher bug, not a client error.
            unreachable!("FOK orders are fully consumed or rejected up front")
        }
        (OrderType::Limit, TimeInForce::Gtc) => {
            let price = incoming.price.expect("limit order has a price");
            book.rest(incoming.side, price, incoming.order_id);
            incoming.status = if nothing_filled {
                OrderStatus::Open
            } else {
                OrderStatus::PartiallyFilled
            };
        }
    }
    Ok(())
}
