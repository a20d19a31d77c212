//! Per-strategy counters, surfaced at `GET /api/v1/admin/failures` (spec
//! §4.2 expansion).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyStats {
    pub applied: u64,
    pub dropped: u64,
    pub delayed: u64,
    pub duplicated: u64,
    pub corrupted: u64,
}

/// Monotonic, process-lifetime counters. `Relaxed` ordering is fine: these
/// are observability counters, not synchronization primitives.
#[derive(Default)]
pub struct StrategyCounters {
    applied: AtomicU64,
    dropped: AtomicU64,
    delayed: AtomicU64,
    duplicated: AtomicU64,
    corrupted: AtomicU64,
}

impl StrategyCounters {
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delayed(&self) {
        self.delayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicated(&self) {
        self.duplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupted(&self) {
        self.corrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StrategyStats {
        StrategyStats {
            applied: self.applied.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            duplicated: self.duplicated.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot_reflects_records() {
        let counters = StrategyCounters::default();
        counters.record_applied();
        counters.record_applied();
        counters.record_dropped();
        let snap = counters.snapshot();
        assert_eq!(snap.applied, 2);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.delayed, 0);
    }
}
