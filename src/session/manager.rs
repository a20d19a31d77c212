//! Session table: active connections, their subscriptions, and a bounded
//! outbound queue per session with backpressure (spec §4.4).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::marketdata::Channel;
use crate::money::Symbol;

/// Outbound queue depth per session. Exceeding this is treated as
/// throttled: the session is falling behind and the failure injector
/// should start shedding or delaying its outbound traffic (spec §4.4).
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub struct Session {
    pub id: String,
    outbound_tx: mpsc::Sender<String>,
    subscriptions: HashSet<(Channel, Symbol)>,
}

impl Session {
    pub fn is_subscribed(&self, channel: Channel, symbol: &Symbol) -> bool {
        self.subscriptions.contains(&(channel, symbol.clone()))
    }

    /// Fraction of the outbound queue currently occupied, in `[0.0, 1.0]`.
    pub fn backpressure(&self) -> f64 {
        let remaining = self.outbound_tx.capacity();
        1.0 - (remaining as f64 / OUTBOUND_QUEUE_CAPACITY as f64)
    }

    pub fn is_throttled(&self) -> bool {
        self.backpressure() >= 0.9
    }
}

/// Shared, lockable session table. WS connection handlers register on
/// upgrade and deregister on disconnect; handlers and the market-data
/// publisher look sessions up to deliver to them.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns the receiving half of its
    /// outbound queue, which the connection's writer task drains.
    pub async fn register(&self, session_id: impl Into<String>) -> mpsc::Receiver<String> {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session = Session {
            id: session_id.clone(),
            outbound_tx: tx,
            subscriptions: HashSet::new(),
        };
        self.sessions.write().await.insert(session_id, session);
        rx
    }

    pub async fn deregister(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
        debug!(session_id, "session deregistered");
    }

    pub async fn subscribe(&self, session_id: &str, channel: Channel, symbol: Symbol) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.subscriptions.insert((channel, symbol));
        }
    }

    pub async fn unsubscribe(&self, session_id: &str, channel: Channel, symbol: &Symbol) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.subscriptions.remove(&(channel, symbol.clone()));
        }
    }

    /// Enqueues `msg` for exactly one session's outbound queue. Returns
    /// `false` if the session is unknown or its queue is full.
    pub async fn send_to(&self, session_id: &str, msg: String) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) => session.outbound_tx.try_send(msg).is_ok(),
            None => false,
        }
    }

    /// Enqueues `msg` for every session subscribed to `(channel, symbol)`.
    /// Bypasses the outbound failure chain — only used directly by tests and
    /// by callers that have already run `msg` through it themselves.
    pub async fn broadcast_to_subscribers(&self, channel: Channel, symbol: &Symbol, msg: String) {
        let sessions = self.sessions.read().await;
        for session in sessions.values() {
            if session.is_subscribed(channel, symbol) {
                let _ = session.outbound_tx.try_send(msg.clone());
            }
        }
    }

    /// Ids of every session subscribed to `(channel, symbol)`, so a caller
    /// can run one wire message through each session's own outbound failure
    /// chain before delivery (spec §4.3 point 4).
    pub async fn subscribed_sessions(&self, channel: Channel, symbol: &Symbol) -> Vec<String> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_subscribed(channel, symbol))
            .map(|s| s.id.clone())
            .collect()
    }

    pub async fn is_throttled(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.is_throttled())
            .unwrap_or(false)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_send_delivers_to_receiver() {
        let manager = SessionManager::new();
        let mut rx = manager.register("s1").await;
        assert!(manager.send_to("s1", "hello".to_string()).await);
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_unknown_session_fails() {
        let manager = SessionManager::new();
        assert!(!manager.send_to("ghost", "x".to_string()).await);
    }

    #[tokio::test]
    async fn test_subscribe_then_broadcast_reaches_only_subscribers() {
        let manager = SessionManager::new();
        let mut rx1 = manager.register("s1").await;
        let mut rx2 = manager.register("s2").await;
        let symbol = Symbol::new("BTC", "USD");
        manager.subscribe("s1", Channel::Ticker, symbol.clone()).await;

        manager
            .broadcast_to_subscribers(Channel::Ticker, &symbol, "tick".to_string())
            .await;

        assert_eq!(rx1.recv().await.unwrap(), "tick");
        assert!(rx2.try_recv().is_err());
        let _ = &mut rx2;
    }

    #[tokio::test]
    async fn test_deregister_removes_session() {
        let manager = SessionManager::new();
        manager.register("s1").await;
        assert_eq!(manager.session_count().await, 1);
        manager.deregister("s1").await;
        assert_eq!(manager.session_count().await, 0);
    }
}
