//! The failure injection pipeline: per-session strategy chains applied on
//! the inbound and outbound paths, plus the REST-only rate limiter (spec
//! §4.2).

pub mod pipeline;
pub mod scheduler;
pub mod stats;
pub mod strategies;
pub mod types;

use std::sync::Arc;

use crate::config::FailureConfig;

pub use pipeline::FailurePipeline;
pub use scheduler::Scheduler;
pub use stats::StrategyStats;
pub use strategies::{RateLimitDecision, RestRateLimit};
pub use types::{Outcome, Strategy};

/// The inbound chain, outbound chain, and REST rate limiter built from one
/// `FailureConfig`. `Throttle` is inbound-only and `SilentConnection` is
/// outbound-only per spec §4.2; every other mode applies to both paths.
pub struct FailureChains {
    pub inbound: FailurePipeline,
    pub outbound: FailurePipeline,
    pub rate_limit: Arc<RestRateLimit>,
    pub scheduler: Arc<Scheduler>,
}

impl FailureChains {
    pub fn from_config(config: &FailureConfig) -> Self {
        let scheduler = Scheduler::spawn();
        let rate_limit = Arc::new(RestRateLimit::new(config.modes.rate_limit.requests_per_second));

        if !config.enabled {
            return Self {
                inbound: FailurePipeline::disabled(scheduler.clone()),
                outbound: FailurePipeline::disabled(scheduler.clone()),
                rate_limit,
                scheduler,
            };
        }

        let modes = &config.modes;
        let mut inbound: Vec<Arc<dyn Strategy>> = Vec::new();
        let mut outbound: Vec<Arc<dyn Strategy>> = Vec::new();

        if modes.drop_messages.enabled {
            let drop = Arc::new(strategies::DropMessage::new(modes.drop_messages.probability));
            inbound.push(drop.clone());
            outbound.push(drop);
        }
        if modes.delay_messages.enabled {
            let delay = Arc::new(strategies::DelayMessage::new(
                modes.delay_messages.min_ms,
                modes.delay_messages.max_ms,
            ));
            inbound.push(delay.clone());
            outbound.push(delay);
        }
        if modes.latency.enabled {
            use crate::config::LatencyPreset;
            let (in_link, out_link): (Arc<dyn Strategy>, Arc<dyn Strategy>) = match modes.latency.mode {
                LatencyPreset::Stable => (
                    Arc::new(strategies::LatencyLink::stable()),
                    Arc::new(strategies::LatencyLink::stable()),
                ),
                LatencyPreset::Typical => (
                    Arc::new(strategies::LatencyLink::typical()),
                    Arc::new(strategies::LatencyLink::typical()),
                ),
            };
            inbound.push(in_link);
            outbound.push(out_link);
        }

        Self::finish(inbound, outbound, modes, rate_limit, scheduler)
    }

    fn finish(
        mut inbound: Vec<Arc<dyn Strategy>>,
        mut outbound: Vec<Arc<dyn Strategy>>,
        modes: &crate::config::FailureModes,
        rate_limit: Arc<RestRateLimit>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        if modes.duplicate.enabled {
            let duplicate = Arc::new(strategies::Duplicate::new(modes.duplicate.probability));
            inbound.push(duplicate.clone());
            outbound.push(duplicate);
        }
        if modes.reorder.enabled {
            let reorder_in = Arc::new(strategies::Reorder::new(modes.reorder.buffer_size));
            let reorder_out = Arc::new(strategies::Reorder::new(modes.reorder.buffer_size));
            inbound.push(reorder_in);
            outbound.push(reorder_out);
        }
        if modes.corrupt.enabled {
            let corrupt = Arc::new(strategies::Corrupt::new(modes.corrupt.probability));
            inbound.push(corrupt.clone());
            outbound.push(corrupt);
        }
        if modes.throttle.enabled {
            inbound.push(Arc::new(strategies::Throttle::new(
                modes.throttle.tokens_per_second,
                modes.throttle.burst,
            )));
        }
        if modes.silent_connection.enabled {
            outbound.push(Arc::new(strategies::SilentConnection::new(
                modes.silent_connection.after_messages,
            )));
        }

        Self {
            inbound: FailurePipeline::new(inbound, scheduler.clone()),
            outbound: FailurePipeline::new(outbound, scheduler.clone()),
            rate_limit,
            scheduler,
        }
    }

    /// Merges per-strategy counters from both chains by strategy name, for
    /// `GET /api/v1/admin/failures`.
    pub fn report(&self) -> Vec<(&'static str, StrategyStats)> {
        let mut merged: std::collections::HashMap<&'static str, StrategyStats> = std::collections::HashMap::new();
        for (name, stats) in self.inbound.stats().into_iter().chain(self.outbound.stats()) {
            let entry = merged.entry(name).or_default();
            entry.applied += stats.applied;
            entry.dropped += stats.dropped;
            entry.delayed += stats.delayed;
            entry.duplicated += stats.duplicated;
            entry.corrupted += stats.corrupted;
        }
        merged.into_iter().collect()
    }
}
