//! SilentConnection (spec §4.2 strategy 9): after `after_messages`
//! successful outbound sends on a session, drop all further outbound
//! traffic for it without closing the socket. Inbound is unaffected — this
//! strategy must only be wired into the outbound chain.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct SilentConnection {
    after_messages: u64,
    sent: Mutex<HashMap<String, u64>>,
    counters: StrategyCounters,
}

impl SilentConnection {
    pub fn new(after_messages: u64) -> Self {
        Self {
            after_messages,
            sent: Mutex::new(HashMap::new()),
            counters: StrategyCounters::default(),
        }
    }

    /// Clears a session's counter, used when `reset_on_reconnect` is set
    /// and a new session id is minted for the same logical client.
    pub fn reset_session(&self, session_id: &str) {
        self.sent.lock().unwrap().remove(session_id);
    }
}

impl Strategy for SilentConnection {
    fn name(&self) -> &'static str {
        "silent_connection"
    }

    fn apply(&self, msg: String, session_id: &str) -> Outcome {
        self.counters.record_applied();
        let mut sent = self.sent.lock().unwrap();
        let count = sent.entry(session_id.to_string()).or_insert(0);
        if *count >= self.after_messages {
            self.counters.record_dropped();
            return Outcome::Drop;
        }
        *count += 1;
        Outcome::Pass(msg)
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goes_silent_after_threshold() {
        let strategy = SilentConnection::new(2);
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Pass(_)));
        assert!(matches!(strategy.apply("b".into(), "s1"), Outcome::Pass(_)));
        assert!(matches!(strategy.apply("c".into(), "s1"), Outcome::Drop));
        assert!(matches!(strategy.apply("d".into(), "s1"), Outcome::Drop));
    }

    #[test]
    fn test_one_session_going_silent_does_not_affect_another() {
        let strategy = SilentConnection::new(1);
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Pass(_)));
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Drop));
        assert!(matches!(strategy.apply("b".into(), "s2"), Outcome::Pass(_)));
    }

    #[test]
    fn test_reset_session_clears_the_counter() {
        let strategy = SilentConnection::new(1);
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Pass(_)));
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Drop));
        strategy.reset_session("s1");
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Pass(_)));
    }
}
