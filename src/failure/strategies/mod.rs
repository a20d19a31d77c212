//! The nine pluggable failure modes (spec §4.2).

pub mod corrupt;
pub mod delay;
pub mod drop;
pub mod duplicate;
pub mod latency;
pub mod rate_limit;
pub mod reorder;
pub mod silent;
pub mod throttle;

pub use corrupt::Corrupt;
pub use delay::DelayMessage;
pub use drop::DropMessage;
pub use duplicate::Duplicate;
pub use latency::LatencyLink;
pub use rate_limit::{RateLimitDecision, RestRateLimit};
pub use reorder::Reorder;
pub use silent::SilentConnection;
pub use throttle::Throttle;
