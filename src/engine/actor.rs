//! The engine actor: the single task that owns `Engine` exclusively, per
//! spec §5 ("engine exclusivity"). Every mutation and every read goes
//! through this task's command loop, so price-time priority always sees a
//! total order — there is no lock taken from multiple call sites to race on.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{
    Engine, EngineResult, Fill, NoLiquidityBehavior, Order, OrderFilter, PlaceOrderRequest,
};
use crate::money::{Asset, Balance, Symbol};

enum Command {
    PlaceOrder {
        session_id: String,
        req: PlaceOrderRequest,
        reply: oneshot::Sender<EngineResult<(Order, Vec<Fill>)>>,
    },
    CancelOrder {
        session_id: String,
        order_id: Uuid,
        reply: oneshot::Sender<EngineResult<Order>>,
    },
    GetOrder {
        session_id: String,
        order_id: Uuid,
        reply: oneshot::Sender<EngineResult<Order>>,
    },
    ListOrders {
        session_id: String,
        filter: OrderFilter,
        reply: oneshot::Sender<Vec<Order>>,
    },
    Balance {
        session_id: String,
        reply: oneshot::Sender<HashMap<Asset, Balance>>,
    },
    Position {
        session_id: String,
        asset: String,
        reply: oneshot::Sender<Balance>,
    },
    BestBidAsk {
        symbol: Symbol,
        reply: oneshot::Sender<Option<(Option<Decimal>, Option<Decimal>)>>,
    },
    Symbols {
        reply: oneshot::Sender<Vec<Symbol>>,
    },
}

/// A cheaply-cloneable handle used by every handler to talk to the engine
/// actor. Each call sends a command and awaits its reply — the read-side
/// equivalent of the "point-in-time snapshot" the spec calls for.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

/// Channel depth for the engine's command queue. Generous because a burst
/// of REST rate-limit testing (spec scenario 5) can fire dozens of requests
/// within one second.
const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Fill broadcast depth. Multiple independent subscribers (market-data
/// publisher, per-session fill router) each get their own lagging cursor.
const FILL_CHANNEL_CAPACITY: usize = 4096;

impl EngineHandle {
    /// Spawns the actor task and returns a handle plus the broadcast sender
    /// for matched fills. Callers `subscribe()` to it as many times as they
    /// need — once for the market-data publisher's anonymized `TRADE` feed,
    /// once for routing per-session `FILL` notifications to maker and
    /// taker alike.
    pub fn spawn(engine: Engine) -> (Self, broadcast::Sender<Fill>) {
        let (tx, mut rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (fill_tx, _) = broadcast::channel(FILL_CHANNEL_CAPACITY);
        let fill_tx_task = fill_tx.clone();

        tokio::spawn(async move {
            let mut engine = engine;
            info!("engine actor started");
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::PlaceOrder {
                        session_id,
                        req,
                        reply,
                    } => {
                        let result = engine.place_order(&session_id, req);
                        if let Ok((_, fills)) = &result {
                            for fill in fills {
                                // Err here just means nobody is currently subscribed.
                                let _ = fill_tx_task.send(fill.clone());
                            }
                        }
                        let _ = reply.send(result);
                    }
                    Command::CancelOrder {
                        session_id,
                        order_id,
                        reply,
                    } => {
                        let _ = reply.send(engine.cancel_order(&session_id, order_id));
                    }
                    Command::GetOrder {
                        session_id,
                        order_id,
                        reply,
                    } => {
                        let _ = reply.send(engine.get_order(&session_id, order_id));
                    }
                    Command::ListOrders {
                        session_id,
                        filter,
                        reply,
                    } => {
                        let _ = reply.send(engine.list_orders(&session_id, filter));
                    }
                    Command::Balance { session_id, reply } => {
                        let _ = reply.send(engine.balance(&session_id));
                    }
                    Command::Position {
                        session_id,
                        asset,
                        reply,
                    } => {
                        let _ = reply.send(engine.position(&session_id, &asset));
                    }
                    Command::BestBidAsk { symbol, reply } => {
                        let _ = reply.send(engine.best_bid_ask(&symbol));
                    }
                    Command::Symbols { reply } => {
                        let _ = reply.send(engine.symbols().cloned().collect());
                    }
                }
            }
            info!("engine actor stopped: command channel closed");
        });

        (Self { tx }, fill_tx)
    }

    pub async fn place_order(
        &self,
        session_id: impl Into<String>,
        req: PlaceOrderRequest,
    ) -> EngineResult<(Order, Vec<Fill>)> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PlaceOrder {
            session_id: session_id.into(),
            req,
            reply,
        })
        .await;
        rx.await.expect("engine actor dropped reply sender")
    }

    pub async fn cancel_order(
        &self,
        session_id: impl Into<String>,
        order_id: Uuid,
    ) -> EngineResult<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CancelOrder {
            session_id: session_id.into(),
            order_id,
            reply,
        })
        .await;
        rx.await.expect("engine actor dropped reply sender")
    }

    pub async fn get_order(
        &self,
        session_id: impl Into<String>,
        order_id: Uuid,
    ) -> EngineResult<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetOrder {
            session_id: session_id.into(),
            order_id,
            reply,
        })
        .await;
        rx.await.expect("engine actor dropped reply sender")
    }

    pub async fn list_orders(
        &self,
        session_id: impl Into<String>,
        filter: OrderFilter,
    ) -> Vec<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ListOrders {
            session_id: session_id.into(),
            filter,
            reply,
        })
        .await;
        rx.await.unwrap_or_default()
    }

    pub async fn balance(&self, session_id: impl Into<String>) -> HashMap<Asset, Balance> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Balance {
            session_id: session_id.into(),
            reply,
        })
        .await;
        rx.await.unwrap_or_default()
    }

    pub async fn position(&self, session_id: impl Into<String>, asset: impl Into<String>) -> Balance {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Position {
            session_id: session_id.into(),
            asset: asset.into(),
            reply,
        })
        .await;
        rx.await.unwrap_or_default()
    }

    pub async fn best_bid_ask(&self, symbol: Symbol) -> Option<(Option<Decimal>, Option<Decimal>)> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::BestBidAsk { symbol, reply }).await;
        rx.await.unwrap_or(None)
    }

    pub async fn symbols(&self) -> Vec<Symbol> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Symbols { reply }).await;
        rx.await.unwrap_or_default()
    }

    async fn send(&self, cmd: Command) {
        if self.tx.send(cmd).await.is_err() {
            warn!("engine actor command channel closed; request dropped");
        }
    }
}

/// Default no-liquidity behavior used when wiring up an `Engine` for tests
/// that don't care about the distinction.
pub fn default_no_liquidity() -> NoLiquidityBehavior {
    NoLiquidityBehavior::Reject
}
