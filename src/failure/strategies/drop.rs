//! Bernoulli message drop (spec §4.2 strategy 1).

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct DropMessage {
    probability: f64,
    counters: StrategyCounters,
}

impl DropMessage {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for DropMessage {
    fn name(&self) -> &'static str {
        "drop_message"
    }

    fn apply(&self, msg: String, _session_id: &str) -> Outcome {
        self.counters.record_applied();
        if rand::random::<f64>() < self.probability {
            self.counters.record_dropped();
            Outcome::Drop
        } else {
            Outcome::Pass(msg)
        }
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_zero_never_drops() {
        let strategy = DropMessage::new(0.0);
        for _ in 0..50 {
            assert!(matches!(strategy.apply("x".into(), "s"), Outcome::Pass(_)));
        }
        assert_eq!(strategy.stats().dropped, 0);
    }

    #[test]
    fn test_probability_one_always_drops() {
        let strategy = DropMessage::new(1.0);
        for _ in 0..50 {
            assert!(matches!(strategy.apply("x".into(), "s"), Outcome::Drop));
        }
        assert_eq!(strategy.stats().applied, 50);
        assert_eq!(strategy.stats().dropped, 50);
    }
}
