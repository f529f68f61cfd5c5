//! # Domain Invariants
//!
//! Constants and rules that must always hold for confirmation state.

use std::collections::BTreeSet;
use std::time::Duration;

use super::entities::{ConfirmationHistory, ConfirmationRound};

/// Maximum number of rounds kept in the history.
pub const MAX_HISTORY_ROUNDS: usize = 50;

/// Rounds older than this (relative to the newest round) are evicted.
pub const HISTORY_RETENTION: Duration = Duration::from_secs(60 + 15);

/// Default number of validator nodes queried per round.
pub const DEFAULT_VALIDATORS_COUNT: usize = 3;

/// Peer lists must overlap by strictly more than this share of the smaller list.
pub const PEER_SIMILARITY_PERCENT: u8 = 70;

/// Multiplier applied to `rejections / confirmations`.
pub const REJECTION_WEIGHT: f64 = 2.0;

/// Invariant: a node appears in at most one bucket of a round.
pub fn invariant_node_exclusive(round: &ConfirmationRound) -> bool {
    let mut seen = BTreeSet::new();
    round
        .processing()
        .map(str::to_string)
        .chain(round.confirming_nodes().iter().map(|n| n.address.clone()))
        .chain(round.rejecting_nodes().iter().map(|n| n.address.clone()))
        .chain(round.timed_out_nodes().iter().map(|n| n.address.clone()))
        .all(|address| seen.insert(address))
}

/// Invariant: history is bounded in size and age.
pub fn invariant_history_bounded(
    history: &ConfirmationHistory,
    max_rounds: usize,
    retention: Duration,
) -> bool {
    if history.len() > max_rounds {
        return false;
    }
    let Some(newest) = history.iter().map(|r| r.request_time).max() else {
        return true;
    };
    history
        .iter()
        .all(|r| newest.duration_since(r.request_time) <= retention)
}
