//! Fault injection and call accounting for in-memory adapters.

use docvault_core::{DocVaultResult, DocumentId, StorageError, StoreOp};
use std::collections::HashMap;
use std::sync::Mutex;

/// How long an armed fault stays armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Fire on the next matching call, then disarm.
    Once,
    /// Fire on every matching call until cleared.
    Always,
}

/// Forces chosen store operations to fail.
#[derive(Debug, Default)]
pub struct FaultInjector {
    armed: Mutex<HashMap<StoreOp, FaultMode>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_once(&self, op: StoreOp) {
        self.arm(op, FaultMode::Once);
    }

    pub fn fail_always(&self, op: StoreOp) {
        self.arm(op, FaultMode::Always);
    }

    pub fn arm(&self, op: StoreOp, mode: FaultMode) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(op, mode);
        }
    }

    pub fn clear(&self, op: StoreOp) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.remove(&op);
        }
    }

    pub fn clear_all(&self) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.clear();
        }
    }

    pub fn is_armed(&self, op: StoreOp) -> bool {
        self.armed
            .lock()
            .map(|armed| armed.contains_key(&op))
            .unwrap_or(false)
    }

    /// Fail if a fault is armed for `op`, consuming a `Once` fault.
    pub fn check(&self, op: StoreOp, id: Option<DocumentId>) -> DocVaultResult<()> {
        let mut armed = self.armed.lock().map_err(|_| StorageError::LockPoisoned)?;
        let fire = match armed.get(&op) {
            Some(FaultMode::Once) => {
                armed.remove(&op);
                true
            }
            Some(FaultMode::Always) => true,
            None => false,
        };
        if !fire {
            return Ok(());
        }

        let reason = "injected fault".to_string();
        let err = match id {
            Some(id) => StorageError::OperationFailed { op, id, reason },
            None => StorageError::QueryFailed { op, reason },
        };
        Err(err.into())
    }
}

/// Per-operation call counts.
#[derive(Debug, Default)]
pub struct CallCounter {
    counts: Mutex<HashMap<StoreOp, u64>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, op: StoreOp) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(op).or_insert(0) += 1;
        }
    }

    pub fn count(&self, op: StoreOp) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    /// Calls that could have changed store contents.
    pub fn mutations(&self) -> u64 {
        self.counts
            .lock()
            .map(|counts| {
                counts
                    .iter()
                    .filter(|(op, _)| op.is_mutation())
                    .map(|(_, n)| n)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.clear();
        }
    }
}
