//! The uniform strategy transform (spec §4.2): every strategy in the chain
//! consumes one wire-level message and produces zero, one, many, or one
//! delayed message. Messages are the raw JSON text, not a parsed `Value` —
//! `Corrupt` needs to mutate bytes that may no longer parse, and the
//! handler downstream is already responsible for rejecting malformed JSON
//! gracefully (spec §4.5).

use std::time::Duration;

use super::stats::StrategyStats;

pub enum Outcome {
    Drop,
    Pass(String),
    Expand(Vec<String>),
    Delayed(String, Duration),
}

/// One pluggable failure mode. Strategies are stateful where the spec
/// requires it (throttle, silent connection) via interior mutability, so
/// `apply` takes `&self` and the chain can hold a `Vec<Arc<dyn Strategy>>`.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, msg: String, session_id: &str) -> Outcome;
    fn stats(&self) -> StrategyStats;
}
