//! Buffers up to `buffer_size` messages per session and releases them in a
//! random permutation once the buffer fills (spec §4.2 strategy 5).
//!
//! The uniform strategy signature has no side channel for a background
//! flush timer, so this implementation triggers only on buffer-fill; a
//! timer-driven flush of a partially-filled buffer is not modeled.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::seq::SliceRandom;

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct Reorder {
    buffer_size: usize,
    buffers: Mutex<HashMap<String, Vec<String>>>,
    counters: StrategyCounters,
}

impl Reorder {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            buffers: Mutex::new(HashMap::new()),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for Reorder {
    fn name(&self) -> &'static str {
        "reorder"
    }

    fn apply(&self, msg: String, session_id: &str) -> Outcome {
        self.counters.record_applied();
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.entry(session_id.to_string()).or_default();
        buffer.push(msg);
        if buffer.len() < self.buffer_size {
            return Outcome::Drop;
        }
        let mut batch = std::mem::take(buffer);
        batch.shuffle(&mut rand::thread_rng());
        Outcome::Expand(batch)
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_all_buffered_messages_once_full() {
        let strategy = Reorder::new(3);
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Drop));
        assert!(matches!(strategy.apply("b".into(), "s1"), Outcome::Drop));
        match strategy.apply("c".into(), "s1") {
            Outcome::Expand(mut batch) => {
                batch.sort();
                assert_eq!(batch, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
            }
            _ => panic!("expected Expand on buffer fill"),
        }
    }

    #[test]
    fn test_buffers_are_independent_per_session() {
        let strategy = Reorder::new(2);
        assert!(matches!(strategy.apply("a".into(), "s1"), Outcome::Drop));
        assert!(matches!(strategy.apply("x".into(), "s2"), Outcome::Drop));
        assert!(matches!(strategy.apply("b".into(), "s1"), Outcome::Expand(_)));
    }
}
