//! Lightweight runtime counters for the lock system.
//!
//! Incremented on the interaction hot path with relaxed atomics and read
//! only when an adapter asks for a snapshot, so they cost one atomic add
//! per event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for high-frequency lock events.
#[derive(Debug)]
pub struct LockCounters {
    /// Locks created since startup.
    pub locks_created: AtomicU64,
    /// Locks removed since startup (including purges and authorized breaks).
    pub locks_removed: AtomicU64,
    /// Lock mutations applied through `update`.
    pub locks_updated: AtomicU64,
    /// Interactions denied by policy or by a failed pending apply.
    pub access_denied: AtomicU64,
    /// Pending interactions applied against a qualifying target.
    pub interactions_applied: AtomicU64,
    /// Pending interactions consumed (removed after an apply).
    pub interactions_consumed: AtomicU64,
    /// Withdrawal attempts cancelled on donation or restricted locks.
    pub withdrawals_blocked: AtomicU64,
}

impl LockCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locks_created: AtomicU64::new(0),
            locks_removed: AtomicU64::new(0),
            locks_updated: AtomicU64::new(0),
            access_denied: AtomicU64::new(0),
            interactions_applied: AtomicU64::new(0),
            interactions_consumed: AtomicU64::new(0),
            withdrawals_blocked: AtomicU64::new(0),
        }
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            locks_created: self.locks_created.load(Ordering::Relaxed),
            locks_removed: self.locks_removed.load(Ordering::Relaxed),
            locks_updated: self.locks_updated.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            interactions_applied: self.interactions_applied.load(Ordering::Relaxed),
            interactions_consumed: self.interactions_consumed.load(Ordering::Relaxed),
            withdrawals_blocked: self.withdrawals_blocked.load(Ordering::Relaxed),
        }
    }
}

impl Default for LockCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    /// Locks created.
    pub locks_created: u64,
    /// Locks removed.
    pub locks_removed: u64,
    /// Lock mutations applied.
    pub locks_updated: u64,
    /// Denied interactions.
    pub access_denied: u64,
    /// Pending interactions applied.
    pub interactions_applied: u64,
    /// Pending interactions consumed.
    pub interactions_consumed: u64,
    /// Withdrawals blocked.
    pub withdrawals_blocked: u64,
}
