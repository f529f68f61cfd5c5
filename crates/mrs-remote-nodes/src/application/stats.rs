//! Running counters of the confirmation service.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ReplyOutcome;

/// Statistics for the confirmation service.
#[derive(Debug, Default)]
pub struct ConfirmationStats {
    /// Rounds started
    pub rounds_started: AtomicU64,
    /// Validator replies that matched the primary
    pub confirming: AtomicU64,
    /// Validator replies that diverged from the primary
    pub rejecting: AtomicU64,
    /// Error replies and transport failures
    pub discounted: AtomicU64,
    /// Validators that missed the round deadline
    pub timed_out: AtomicU64,
    /// Replies whose round had already been evicted
    pub late_discarded: AtomicU64,
}

impl ConfirmationStats {
    /// Count a classified reply.
    pub fn record(&self, outcome: ReplyOutcome) {
        let counter = match outcome {
            ReplyOutcome::Confirming => &self.confirming,
            ReplyOutcome::Rejecting => &self.rejecting,
            ReplyOutcome::Discounted => &self.discounted,
            ReplyOutcome::TimedOut => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rounds_started: self.rounds_started.load(Ordering::Relaxed),
            confirming: self.confirming.load(Ordering::Relaxed),
            rejecting: self.rejecting.load(Ordering::Relaxed),
            discounted: self.discounted.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            late_discarded: self.late_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ConfirmationStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct StatsSnapshot {
    pub rounds_started: u64,
    pub confirming: u64,
    pub rejecting: u64,
    pub discounted: u64,
    pub timed_out: u64,
    pub late_discarded: u64,
}
