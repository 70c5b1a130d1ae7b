use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// The aggregate completion counts of one batch.
///
/// `total` is fixed at construction.  Each of the three outcome counters only ever goes up, and
/// their sum never exceeds `total` as long as every task records exactly one outcome.
#[derive(Debug)]
pub struct BatchCounters {
    total: u64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl BatchCounters {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Record a successful upload; returns the new completed count.
    pub fn record_completed(&self) -> u64 {
        self.increment(&self.completed)
    }

    /// Record a failed upload; returns the new failed count.
    pub fn record_failed(&self) -> u64 {
        self.increment(&self.failed)
    }

    /// Record a cancelled upload; returns the new cancelled count.
    pub fn record_cancelled(&self) -> u64 {
        self.increment(&self.cancelled)
    }

    fn increment(&self, counter: &AtomicU64) -> u64 {
        let v = counter.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert!(self.snapshot().settled() <= self.total, "more outcomes recorded than tasks in the batch");
        v
    }

    /// Read the counters.  The three loads are individually atomic; because every counter is
    /// monotonic, a later snapshot never reports fewer outcomes than an earlier one.
    pub fn snapshot(&self) -> CountSnapshot {
        CountSnapshot {
            total: self.total,
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            cancelled: self.cancelled.load(Ordering::Acquire),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.snapshot().is_settled()
    }
}

/// A point-in-time copy of [`BatchCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSnapshot {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl CountSnapshot {
    /// Number of tasks that reached a terminal state.
    pub fn settled(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.settled())
    }

    pub fn is_settled(&self) -> bool {
        self.settled() == self.total
    }

    /// `settled / total`, or 0.0 for an empty batch.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.settled() as f64 / self.total as f64
        }
    }
}
