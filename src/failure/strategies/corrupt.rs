//! Byte-level payload corruption (spec §4.2 strategy 6). Operates on the
//! raw wire text, so a corrupted message may no longer parse as JSON — the
//! receiving handler is expected to reject it with a `MALFORMED` error
//! rather than the pipeline pre-validating on its behalf.

use rand::Rng;

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct Corrupt {
    probability: f64,
    counters: StrategyCounters,
}

impl Corrupt {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for Corrupt {
    fn name(&self) -> &'static str {
        "corrupt"
    }

    fn apply(&self, msg: String, _session_id: &str) -> Outcome {
        self.counters.record_applied();
        if rand::random::<f64>() >= self.probability || msg.is_empty() {
            return Outcome::Pass(msg);
        }
        self.counters.record_corrupted();
        let mut bytes = msg.into_bytes();
        let idx = rand::thread_rng().gen_range(0..bytes.len());
        bytes[idx] ^= 0x01;
        Outcome::Pass(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_zero_leaves_message_untouched() {
        let strategy = Corrupt::new(0.0);
        match strategy.apply(r#"{"a":1}"#.into(), "s") {
            Outcome::Pass(m) => assert_eq!(m, r#"{"a":1}"#),
            _ => panic!("expected Pass"),
        }
    }

    #[test]
    fn test_probability_one_mutates_the_payload() {
        let strategy = Corrupt::new(1.0);
        let original = r#"{"price":"50000"}"#;
        match strategy.apply(original.into(), "s") {
            Outcome::Pass(m) => assert_ne!(m.into_bytes(), original.as_bytes()),
            _ => panic!("expected Pass"),
        }
        assert_eq!(strategy.stats().corrupted, 1);
    }
}
