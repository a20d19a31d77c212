//! Per-session inbound token bucket (spec §4.2 strategy 7). Unlike
//! `RestRateLimit`, this smooths bursts by delaying messages until a token
//! is available rather than rejecting the request outright.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::failure::stats::{StrategyCounters, StrategyStats};
use crate::failure::types::{Outcome, Strategy};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct Throttle {
    tokens_per_second: f64,
    burst: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
    counters: StrategyCounters,
}

impl Throttle {
    pub fn new(tokens_per_second: f64, burst: u32) -> Self {
        Self {
            tokens_per_second,
            burst: burst as f64,
            buckets: Mutex::new(HashMap::new()),
            counters: StrategyCounters::default(),
        }
    }
}

impl Strategy for Throttle {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn apply(&self, msg: String, session_id: &str) -> Outcome {
        self.counters.record_applied();
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(session_id.to_string()).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.tokens_per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Outcome::Pass(msg)
        } else {
            let wait_secs = (1.0 - bucket.tokens) / self.tokens_per_second;
            self.counters.record_delayed();
            Outcome::Delayed(msg, Duration::from_secs_f64(wait_secs.max(0.0)))
        }
    }

    fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}
