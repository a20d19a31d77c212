//! Order lifecycle handlers shared by the WS router and the REST `/orders`
//! routes (spec §4.1, §6.1-6.2).

use uuid::Uuid;

use crate::engine::PlaceOrderRequest;
use crate::router::ServerMessage;

use super::context::HandlerContext;

/// Places an order, returning the resulting `ORDER_UPDATE` followed by one
/// `FILL` per matched pair (spec §4.1 observable side effects). Errors
/// become a single `ERROR` frame.
pub async fn place_order(ctx: &HandlerContext, session_id: &str, req: PlaceOrderRequest) -> Vec<ServerMessage> {
    match ctx.engine.place_order(session_id, req).await {
        Ok((order, fills)) => {
            let order_id = order.order_id;
            let mut out = vec![ServerMessage::OrderUpdate { order }];
            out.extend(fills.into_iter().map(|fill| ServerMessage::Fill {
                order_id,
                price: fill.price,
                quantity: fill.quantity,
                timestamp: fill.timestamp,
            }));
            out
        }
        Err(e) => vec![ServerMessage::from_engine_error(e)],
    }
}

pub async fn cancel_order(ctx: &HandlerContext, session_id: &str, order_id: Uuid) -> Vec<ServerMessage> {
    match ctx.engine.cancel_order(session_id, order_id).await {
        Ok(order) => vec![ServerMessage::OrderUpdate { order }],
        Err(e) => vec![ServerMessage::from_engine_error(e)],
    }
}

pub async fn query_order(ctx: &HandlerContext, session_id: &str, order_id: Uuid) -> Vec<ServerMessage> {
    match ctx.engine.get_order(session_id, order_id).await {
        Ok(order) => vec![ServerMessage::OrderUpdate { order }],
        Err(e) => vec![ServerMessage::from_engine_error(e)],
    }
}
