//! Wire protocol and inbound message dispatch (spec §4.5, §6.2).
//!
//! The WS and REST surfaces share one `ClientMessage`/`ServerMessage`
//! vocabulary; REST handlers build the same `ServerMessage` variants the
//! router produces so both transports serialize identically.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{EngineError, Order, OrderType, PlaceOrderRequest, Side, TimeInForce};
use crate::error::ErrorKind;
use crate::handlers::context::HandlerContext;
use crate::handlers::{heartbeat, order, subscription};
use crate::marketdata::Channel;
use crate::money::Symbol;

/// Messages a session may send inbound, tagged by `type` (spec §6.2).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "PLACE_ORDER")]
    PlaceOrder {
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        #[serde(default)]
        price: Option<Decimal>,
        quantity: Decimal,
        #[serde(default)]
        time_in_force: Option<TimeInForce>,
    },
    #[serde(rename = "CANCEL_ORDER")]
    CancelOrder { order_id: Uuid },
    #[serde(rename = "QUERY_ORDER")]
    QueryOrder { order_id: Uuid },
    #[serde(rename = "SUBSCRIBE")]
    Subscribe { channel: Channel, symbol: Symbol },
    #[serde(rename = "UNSUBSCRIBE")]
    Unsubscribe { channel: Channel, symbol: Symbol },
    #[serde(rename = "PING")]
    Ping {
        #[serde(default)]
        request_id: Option<String>,
    },
}

/// Every type of frame a session may receive outbound (spec §6.2).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "PONG")]
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    #[serde(rename = "ORDER_UPDATE")]
    OrderUpdate { order: Order },
    #[serde(rename = "FILL")]
    Fill {
        order_id: Uuid,
        price: Decimal,
        quantity: Decimal,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    #[serde(rename = "MARKET_DATA")]
    MarketData {
        symbol: Symbol,
        sequence_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
        price: Decimal,
        bid: Decimal,
        ask: Decimal,
        volume_24h: Decimal,
    },
    #[serde(rename = "TRADE")]
    Trade {
        symbol: Symbol,
        price: Decimal,
        quantity: Decimal,
        timestamp: chrono::DateTime<chrono::Utc>,
        aggressor_side: Side,
    },
    #[serde(rename = "ERROR")]
    Error {
        kind: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: kind.as_str(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn from_engine_error(err: EngineError) -> Self {
        Self::error(err.kind(), err.to_string())
    }

    /// Serializes to the wire text carried through the failure chain. Only
    /// fails if a variant contains non-serializable data, which none do.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage always serializes")
    }
}

const KNOWN_TYPES: &[&str] = &[
    "PLACE_ORDER",
    "CANCEL_ORDER",
    "QUERY_ORDER",
    "SUBSCRIBE",
    "UNSUBSCRIBE",
    "PING",
];

/// Parses and dispatches one inbound wire message for `session_id`,
/// returning every `ServerMessage` it produced. Malformed JSON and unknown
/// `type` values are reported but never touch session state (spec §4.5).
pub async fn dispatch(raw: &str, session_id: &str, ctx: &HandlerContext) -> Vec<ServerMessage> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return vec![ServerMessage::error(ErrorKind::Malformed, e.to_string())],
    };

    let type_str = value.get("type").and_then(|t| t.as_str());
    let type_str = match type_str {
        Some(t) => t,
        None => {
            return vec![ServerMessage::error(
                ErrorKind::Malformed,
                "missing \"type\" field",
            )]
        }
    };

    if !KNOWN_TYPES.contains(&type_str) {
        return vec![ServerMessage::error(
            ErrorKind::UnknownMessageType,
            format!("unknown message type: {type_str}"),
        )];
    }

    let message: ClientMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => return vec![ServerMessage::error(ErrorKind::Malformed, e.to_string())],
    };

    handle(message, session_id, ctx).await
}

async fn handle(message: ClientMessage, session_id: &str, ctx: &HandlerContext) -> Vec<ServerMessage> {
    match message {
        ClientMessage::PlaceOrder {
            symbol,
            side,
            order_type,
            price,
            quantity,
            time_in_force,
        } => {
            order::place_order(
                ctx,
                session_id,
                PlaceOrderRequest {
                    symbol,
                    side,
                    order_type,
                    price,
                    quantity,
                    time_in_force,
                },
            )
            .await
        }
        ClientMessage::CancelOrder { order_id } => order::cancel_order(ctx, session_id, order_id).await,
        ClientMessage::QueryOrder { order_id } => order::query_order(ctx, session_id, order_id).await,
        ClientMessage::Subscribe { channel, symbol } => {
            subscription::subscribe(ctx, session_id, channel, symbol).await
        }
        ClientMessage::Unsubscribe { channel, symbol } => {
            subscription::unsubscribe(ctx, session_id, channel, symbol).await
        }
        ClientMessage::Ping { request_id } => heartbeat::ping(request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::engine::actor::EngineHandle;
    use crate::engine::{Engine, NoLiquidityBehavior};
    use crate::failure::FailureChains;
    use crate::session::SessionManager;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn test_ctx() -> HandlerContext {
        let config = AppConfig::default();
        let mut default_balance = HashMap::new();
        for (asset, amount) in &config.exchange.default_balance {
            default_balance.insert(Arc::from(asset.as_str()), *amount);
        }
        let engine = Engine::new(
            config.exchange.symbols.clone(),
            default_balance,
            NoLiquidityBehavior::Reject,
        );
        let (engine, _fills) = EngineHandle::spawn(engine);
        HandlerContext {
            engine,
            sessions: SessionManager::new(),
            failures: Arc::new(FailureChains::from_config(&config.failures)),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_yields_malformed_error() {
        let ctx = test_ctx();
        let out = dispatch("not json", "s1", &ctx).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::Error { kind, .. }] if *kind == ErrorKind::Malformed.as_str()
        ));
    }

    #[tokio::test]
    async fn test_unknown_type_yields_unknown_message_type_error() {
        let ctx = test_ctx();
        let out = dispatch(r#"{"type":"FROB"}"#, "s1", &ctx).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::Error { kind, .. }] if *kind == ErrorKind::UnknownMessageType.as_str()
        ));
    }

    #[tokio::test]
    async fn test_ping_echoes_request_id() {
        let ctx = test_ctx();
        let out = dispatch(r#"{"type":"PING","request_id":"abc"}"#, "s1", &ctx).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::Pong { request_id }] if request_id.as_deref() == Some("abc")
        ));
    }

    #[tokio::test]
    async fn test_place_order_then_query_round_trips() {
        let ctx = test_ctx();
        let place = dispatch(
            r#"{"type":"PLACE_ORDER","symbol":"BTC/USD","side":"BUY","order_type":"LIMIT","price":"50000","quantity":"1"}"#,
            "s1",
            &ctx,
        )
        .await;
        let order_id = match place.as_slice() {
            [ServerMessage::OrderUpdate { order }] => order.order_id,
            other => panic!("expected one ORDER_UPDATE, got {other:?}"),
        };

        let query = dispatch(
            &format!(r#"{{"type":"QUERY_ORDER","order_id":"{order_id}"}}"#),
            "s1",
            &ctx,
        )
        .await;
        assert!(matches!(query.as_slice(), [ServerMessage::OrderUpdate { .. }]));
    }
}
