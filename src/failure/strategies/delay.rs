//! Uniform, explicit delivery delay (spec §4.2 strategy 2).

use std::time::Duration;

use rand::Rng;

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

pub struct DelayMessage {
    min_ms: u64,
    max_ms: u64,
    counters: StrategyCounters,
}

impl DelayMessage {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            max_ms: max_ms.max(min_ms),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for DelayMessage {
    fn name(&self) -> &'static str {
        "delay_message"
    }

    fn apply(&self, msg: String, _session_id: &str) -> Outcome {
        self.counters.record_applied();
        self.counters.record_delayed();
        let delay_ms = if self.max_ms == self.min_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Outcome::Delayed(msg, Duration::from_millis(delay_ms))
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_delays_within_configured_bounds() {
        let strategy = DelayMessage::new(50, 100);
        for _ in 0..20 {
            match strategy.apply("x".into(), "s") {
                Outcome::Delayed(_, d) => {
                    assert!(d.as_millis() >= 50 && d.as_millis() <= 100);
                }
                _ => panic!("expected Delayed"),
            }
        }
    }
}
