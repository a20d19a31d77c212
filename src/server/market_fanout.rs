//! Fans ticks and trades out to subscribed sessions through their own
//! outbound failure chain (spec §4.3 point 4, §6.2 `MARKET_DATA`/`TRADE`).

use tokio::sync::broadcast;
use tracing::warn;

use crate::handlers::HandlerContext;
use crate::marketdata::{Channel, MarketEvent};
use crate::router::ServerMessage;

pub async fn run(ctx: HandlerContext, mut events: broadcast::Receiver<MarketEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "market fanout lagged on event feed");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            MarketEvent::Tick(tick) => {
                let wire = ServerMessage::MarketData {
                    symbol: tick.symbol.clone(),
                    sequence_id: tick.sequence_id,
                    timestamp: tick.timestamp,
                    price: tick.price,
                    bid: tick.bid,
                    ask: tick.ask,
                    volume_24h: tick.volume_24h,
                }
                .to_wire();

                for channel in [Channel::Ticker, Channel::MarketData] {
                    fanout(&ctx, channel, &tick.symbol, &wire).await;
                }
            }
            MarketEvent::Trade(trade) => {
                let wire = ServerMessage::Trade {
                    symbol: trade.symbol.clone(),
                    price: trade.price,
                    quantity: trade.quantity,
                    timestamp: trade.timestamp,
                    aggressor_side: trade.aggressor_side,
                }
                .to_wire();
                fanout(&ctx, Channel::Trades, &trade.symbol, &wire).await;
            }
        }
    }
}

async fn fanout(ctx: &HandlerContext, channel: Channel, symbol: &crate::money::Symbol, wire: &str) {
    for session_id in ctx.sessions.subscribed_sessions(channel, symbol).await {
        tokio::spawn(super::deliver_outbound(ctx.clone(), session_id, wire.to_string()));
    }
}
