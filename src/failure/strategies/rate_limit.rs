//! REST rate limiting with escalating penalties (spec §4.2 strategy 8).
//!
//! Unlike the other strategies this gates a whole HTTP request rather than
//! transforming a message payload, so it does not implement [`Strategy`];
//! it is applied directly by the REST layer before routing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::failure::stats::{StrategyCounters, StrategyStats};

const VIOLATION_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_secs: u64, violation_count: u32 },
}

struct SessionState {
    window_start: Instant,
    request_count: u32,
    violation_count: u32,
    violation_window_start: Instant,
    banned_until: Option<Instant>,
}

impl SessionState {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            request_count: 0,
            violation_count: 0,
            violation_window_start: now,
            banned_until: None,
        }
    }
}

pub struct RestRateLimit {
    requests_per_second: u32,
    sessions: Mutex<HashMap<String, SessionState>>,
    counters: StrategyCounters,
}

impl RestRateLimit {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            sessions: Mutex::new(HashMap::new()),
            counters: StrategyCounters::default(),
        }
    }

    pub fn check(&self, session_id: &str) -> RateLimitDecision {
        self.counters.record_applied();
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap();
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(now));

        if let Some(banned_until) = state.banned_until {
            if now < banned_until {
                self.counters.record_dropped();
                return RateLimitDecision::Limited {
                    retry_after_secs: (banned_until - now).as_secs().max(1),
                    violation_count: state.violation_count,
                };
            }
            state.banned_until = None;
        }

        if now.saturating_duration_since(state.window_start) >= Duration::from_secs(1) {
            state.window_start = now;
            state.request_count = 0;
        }

        if now.saturating_duration_since(state.violation_window_start) >= VIOLATION_WINDOW {
            state.violation_window_start = now;
            state.violation_count = 0;
        }

        state.request_count += 1;
        if state.request_count <= self.requests_per_second {
            return RateLimitDecision::Allowed;
        }

        state.violation_count += 1;
        self.counters.record_dropped();
        let ban_secs = match state.violation_count {
            1 => 10,
            2 => 60,
            _ => u64::MAX / 2, // effectively permanent for the process lifetime
        };
        state.banned_until = Some(now + Duration::from_secs(ban_secs));
        RateLimitDecision::Limited {
            retry_after_secs: ban_secs,
            violation_count: state.violation_count,
        }
    }

    pub fn stats(&self) -> StrategyStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_budget_then_limits() {
        let limiter = RestRateLimit::new(2);
        assert!(matches!(limiter.check("s1"), RateLimitDecision::Allowed));
        assert!(matches!(limiter.check("s1"), RateLimitDecision::Allowed));
        match limiter.check("s1") {
            RateLimitDecision::Limited { retry_after_secs, violation_count } => {
                assert_eq!(retry_after_secs, 10);
                assert_eq!(violation_count, 1);
            }
            _ => panic!("expected a 1st violation"),
        }
    }

    #[test]
    fn test_escalates_bans_on_repeated_violation() {
        let limiter = RestRateLimit::new(0);
        let first = limiter.check("s1");
        assert!(matches!(first, RateLimitDecision::Limited { violation_count: 1, .. }));

        // Still banned: same violation, no new one recorded while banned.
        let second = limiter.check("s1");
        match second {
            RateLimitDecision::Limited { violation_count, .. } => assert_eq!(violation_count, 1),
            _ => panic!("expected still-banned"),
        }
    }

    #[test]
    fn test_sessions_are_independent() {
        let limiter = RestRateLimit::new(1);
        assert!(matches!(limiter.check("s1"), RateLimitDecision::Allowed));
        assert!(matches!(limiter.check("s2"), RateLimitDecision::Allowed));
    }
}
