//! Composes the configured strategies into the linearised, per-session
//! chain the spec describes (§4.2 "Composition rule").

use std::sync::Arc;

use tokio::sync::mpsc;

use super::scheduler::Scheduler;
use super::stats::StrategyStats;
use super::types::{Outcome, Strategy};

#[derive(Clone)]
pub struct FailurePipeline {
    strategies: Arc<Vec<Arc<dyn Strategy>>>,
    scheduler: Arc<Scheduler>,
}

impl FailurePipeline {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            strategies: Arc::new(strategies),
            scheduler,
        }
    }

    /// An empty chain — every message passes through untouched. Used when
    /// `failures.enabled` is false.
    pub fn disabled(scheduler: Arc<Scheduler>) -> Self {
        Self::new(Vec::new(), scheduler)
    }

    pub fn stats(&self) -> Vec<(&'static str, StrategyStats)> {
        self.strategies.iter().map(|s| (s.name(), s.stats())).collect()
    }

    /// Runs `msg` through the full chain for `session_id`. Results that
    /// survive — immediately, or after a scheduled delay — are sent onto
    /// `out`. Stage k sees the output of stage k-1; drops short-circuit;
    /// duplicates/reorders expand the working set before the next stage.
    pub fn process(&self, msg: String, session_id: &str, out: mpsc::UnboundedSender<String>) {
        self.run_from(0, vec![msg], session_id.to_string(), out);
    }

    fn run_from(&self, start: usize, mut working: Vec<String>, session_id: String, out: mpsc::UnboundedSender<String>) {
        for stage in start..self.strategies.len() {
            let strategy = &self.strategies[stage];
            let mut next = Vec::with_capacity(working.len());
            for msg in working {
                match strategy.apply(msg, &session_id) {
                    Outcome::Drop => {}
                    Outcome::Pass(m) => next.push(m),
                    Outcome::Expand(ms) => next.extend(ms),
                    Outcome::Delayed(m, delay) => {
                        let pipeline = self.clone();
                        let session_for_resume = session_id.clone();
                        let out_for_resume = out.clone();
                        self.scheduler.schedule(&session_id, delay, move || {
                            pipeline.run_from(stage + 1, vec![m], session_for_resume, out_for_resume);
                        });
                    }
                }
            }
            working = next;
        }
        for m in working {
            let _ = out.send(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::strategies::drop::DropMessage;
    use crate::failure::strategies::duplicate::Duplicate;

    #[tokio::test]
    async fn test_empty_chain_passes_through_unchanged() {
        let scheduler = Scheduler::spawn();
        let pipeline = FailurePipeline::disabled(scheduler);
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.process(r#"{"type":"PING"}"#.to_string(), "s1", tx);
        let got = rx.recv().await.unwrap();
        assert_eq!(got, r#"{"type":"PING"}"#);
    }

    #[tokio::test]
    async fn test_drop_with_probability_one_yields_nothing() {
        let scheduler = Scheduler::spawn();
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(DropMessage::new(1.0))];
        let pipeline = FailurePipeline::new(strategies, scheduler);
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.process("msg".to_string(), "s1", tx);
        drop(pipeline);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_with_probability_one_yields_two_messages() {
        let scheduler = Scheduler::spawn();
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(Duplicate::new(1.0))];
        let pipeline = FailurePipeline::new(strategies, scheduler);
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.process("msg".to_string(), "s1", tx);
        assert_eq!(rx.recv().await.unwrap(), "msg");
        assert_eq!(rx.recv().await.unwrap(), "msg");
    }
}
