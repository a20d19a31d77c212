//! Probabilistic message duplication (spec §4.2 strategy 4).

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct Duplicate {
    probability: f64,
    counters: StrategyCounters,
}

impl Duplicate {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for Duplicate {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn apply(&self, msg: String, _session_id: &str) -> Outcome {
        self.counters.record_applied();
        if rand::random::<f64>() < self.probability {
            self.counters.record_duplicated();
            Outcome::Expand(vec![msg.clone(), msg])
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
    fn test_probability_zero_never_duplicates() {
        let strategy = Duplicate::new(0.0);
        match strategy.apply("x".into(), "s") {
            Outcome::Pass(m) => assert_eq!(m, "x"),
            _ => panic!("expected Pass"),
        }
    }

    #[test]
    fn test_probability_one_always_duplicates() {
        let strategy = Duplicate::new(1.0);
        match strategy.apply("x".into(), "s") {
            Outcome::Expand(ms) => assert_eq!(ms, vec!["x".to_string(), "x".to_string()]),
            _ => panic!("expected Expand"),
        }
        assert_eq!(strategy.stats().duplicated, 1);
    }
}
