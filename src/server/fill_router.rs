//! Delivers `FILL`/`ORDER_UPDATE` notifications to the *maker* side of a
//! match (spec §4.1 observable side effects). The taker already gets both
//! synchronously as the reply to its own `PLACE_ORDER`; the maker's resting
//! order changed state without it submitting anything, so a background task
//! subscribed to the engine's fill broadcast is the only way to reach it.

use tokio::sync::broadcast;
use tracing::warn;

use crate::engine::Fill;
use crate::handlers::HandlerContext;
use crate::router::ServerMessage;

/// Runs until the fill broadcast closes (i.e. the engine actor stops).
pub async fn run(ctx: HandlerContext, mut fills: broadcast::Receiver<Fill>) {
    loop {
        let fill = match fills.recv().await {
            Ok(fill) => fill,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "fill router lagged on engine fill feed");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if fill.maker_session == fill.taker_session {
            continue;
        }

        let order = match ctx.engine.get_order(fill.maker_session.as_str(), fill.maker_order_id).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, order_id = %fill.maker_order_id, "fill router could not resolve maker order");
                continue;
            }
        };

        let update = ServerMessage::OrderUpdate { order }.to_wire();
        let fill_frame = ServerMessage::Fill {
            order_id: fill.maker_order_id,
            price: fill.price,
            quantity: fill.quantity,
            timestamp: fill.timestamp,
        }
        .to_wire();

        // Delayed strategies may hold this session's sender open well past
        // the current fill; deliver on its own task so a slow maker
        // notification never blocks the next fill in the broadcast. The two
        // frames run sequentially so ORDER_UPDATE is never reordered after
        // its own FILL for this session.
        let ctx = ctx.clone();
        let session = fill.maker_session;
        tokio::spawn(async move {
            super::deliver_outbound(ctx.clone(), session.clone(), update).await;
            super::deliver_outbound(ctx, session, fill_frame).await;
        });
    }
}
