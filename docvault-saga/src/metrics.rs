//! Saga and read-path counters.

use crate::state::SagaState;
use docvault_core::SagaKind;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for saga outcomes and cache effectiveness.
#[derive(Debug, Default)]
pub struct SagaMetrics {
    /// Save sagas that committed
    pub saves_committed: AtomicU64,

    /// Save sagas whose payload step failed and were rolled back (or tried to be)
    pub saves_compensated: AtomicU64,

    /// Save sagas that failed before anything was written
    pub saves_aborted: AtomicU64,

    pub deletes_committed: AtomicU64,
    pub deletes_compensated: AtomicU64,
    pub deletes_aborted: AtomicU64,

    /// Compensations that themselves failed, each one a possible orphan
    pub compensation_failures: AtomicU64,

    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl SagaMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished saga by its final state.
    pub fn record_outcome(&self, kind: SagaKind, state: SagaState) {
        let counter = match (kind, state) {
            (SagaKind::Save, SagaState::Committed) => &self.saves_committed,
            (SagaKind::Save, SagaState::Compensated | SagaState::CompensationFailed) => {
                &self.saves_compensated
            }
            (SagaKind::Save, _) => &self.saves_aborted,
            (SagaKind::Delete, SagaState::Committed) => &self.deletes_committed,
            (SagaKind::Delete, SagaState::Compensated | SagaState::CompensationFailed) => {
                &self.deletes_compensated
            }
            (SagaKind::Delete, _) => &self.deletes_aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if state == SagaState::CompensationFailed {
            self.compensation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> SagaMetricsSnapshot {
        SagaMetricsSnapshot {
            saves_committed: self.saves_committed.load(Ordering::Relaxed),
            saves_compensated: self.saves_compensated.load(Ordering::Relaxed),
            saves_aborted: self.saves_aborted.load(Ordering::Relaxed),
            deletes_committed: self.deletes_committed.load(Ordering::Relaxed),
            deletes_compensated: self.deletes_compensated.load(Ordering::Relaxed),
            deletes_aborted: self.deletes_aborted.load(Ordering::Relaxed),
            compensation_failures: self.compensation_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of saga metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaMetricsSnapshot {
    pub saves_committed: u64,
    pub saves_compensated: u64,
    pub saves_aborted: u64,
    pub deletes_committed: u64,
    pub deletes_compensated: u64,
    pub deletes_aborted: u64,
    pub compensation_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
