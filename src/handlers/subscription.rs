//! `SUBSCRIBE`/`UNSUBSCRIBE` handlers (spec §4.4, §6.2). Neither produces a
//! reply frame — the spec lists no acknowledgement type for either, so
//! success is observed by market data starting (or stopping) to arrive.

use crate::marketdata::Channel;
use crate::money::Symbol;
use crate::router::ServerMessage;

use super::context::HandlerContext;

pub async fn subscribe(ctx: &HandlerContext, session_id: &str, channel: Channel, symbol: Symbol) -> Vec<ServerMessage> {
    ctx.sessions.subscribe(session_id, channel, symbol).await;
    Vec::new()
}

pub async fn unsubscribe(ctx: &HandlerContext, session_id: &str, channel: Channel, symbol: Symbol) -> Vec<ServerMessage> {
    ctx.sessions.unsubscribe(session_id, channel, &symbol).await;
    Vec::new()
}
