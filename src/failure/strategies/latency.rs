//! Log-normal link latency, applied independently inbound and outbound
//! (spec §4.2 strategy 3). Distinct from `DelayMessage`: this models the
//! link itself rather than an explicit, uniform injected delay.

use std::time::Duration;

use rand_distr::{Distribution, LogNormal};

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

/// `mu`/`sigma` for the underlying normal distribution of `ln(latency_ms)`.
pub struct LatencyLink {
    mu: f64,
    sigma: f64,
    counters: StrategyCounters,
}

impl LatencyLink {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self {
            mu,
            sigma,
            counters: StrategyCounters::default(),
        }
    }

    /// EV ≈ 46 ms.
    pub fn stable() -> Self {
        Self::new(3.8, 0.2)
    }

    /// EV ≈ 155 ms.
    pub fn typical() -> Self {
        Self::new(5.0, 0.3)
    }
}

impl Strategy for LatencyLink {
    fn name(&self) -> &'static str {
        "latency_link"
    }

    fn apply(&self, msg: String, _session_id: &str) -> Outcome {
        self.counters.record_applied();
        self.counters.record_delayed();
        let dist = LogNormal::new(self.mu, self.sigma).expect("mu/sigma produce a valid distribution");
        let delay_ms = dist.sample(&mut rand::thread_rng()).max(0.0) as u64;
        Outcome::Delayed(msg, Duration::from_millis(delay_ms))
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}
