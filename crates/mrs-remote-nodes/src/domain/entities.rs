//! # Domain Entities
//!
//! Node registry, confirmation rounds and the bounded round history.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::value_objects::{RemoteNode, ReplyOutcome};

/// Registry of known remote nodes.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<RemoteNode>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge peers into the registry. Known addresses are updated in place.
    ///
    /// Returns the number of newly added nodes.
    pub fn add_nodes(&mut self, peers: impl IntoIterator<Item = RemoteNode>) -> usize {
        let mut added = 0;
        for peer in peers {
            match self.nodes.iter_mut().find(|n| n.address == peer.address) {
                Some(existing) => *existing = peer,
                None => {
                    self.nodes.push(peer);
                    added += 1;
                }
            }
        }
        added
    }

    /// Full refresh: drop every known node and repopulate.
    pub fn refresh(&mut self, peers: impl IntoIterator<Item = RemoteNode>) {
        self.nodes.clear();
        self.add_nodes(peers);
    }

    /// Mark a known node as blacklisted. Returns false for unknown addresses.
    pub fn blacklist(&mut self, address: &str) -> bool {
        match self.nodes.iter_mut().find(|n| n.address == address) {
            Some(node) => {
                node.blacklisted = true;
                true
            }
            None => false,
        }
    }

    /// Up to `count` distinct, non-blacklisted nodes whose address is not in
    /// `exclude`. Shuffled, so repeated calls do not favour insertion order.
    pub fn get_random_nodes(&self, count: usize, exclude: &[&str]) -> Vec<RemoteNode> {
        let mut eligible: Vec<&RemoteNode> = self
            .nodes
            .iter()
            .filter(|n| !n.is_blacklisted() && !exclude.contains(&n.address.as_str()))
            .collect();
        eligible.shuffle(&mut rand::thread_rng());
        eligible.into_iter().take(count).cloned().collect()
    }

    /// Look up a node by address.
    pub fn get(&self, address: &str) -> Option<&RemoteNode> {
        self.nodes.iter().find(|n| n.address == address)
    }

    /// Number of known nodes (blacklisted included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One cross-check of a primary response against validator nodes.
#[derive(Clone, Debug)]
pub struct ConfirmationRound {
    /// Round identifier.
    pub id: Uuid,
    /// Request type, suffix included.
    pub request_type: String,
    /// Monotonic creation time (drives eviction).
    pub request_time: Instant,
    /// Wall-clock creation time (display only).
    pub requested_at: DateTime<Utc>,
    /// Replies still outstanding at this instant are timed out.
    pub deadline: Instant,
    processing: BTreeSet<String>,
    confirming_nodes: Vec<RemoteNode>,
    rejecting_nodes: Vec<RemoteNode>,
    timed_out_nodes: Vec<RemoteNode>,
}

impl ConfirmationRound {
    /// Create an empty round.
    pub fn new(request_type: impl Into<String>, request_time: Instant, reply_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_type: request_type.into(),
            request_time,
            requested_at: Utc::now(),
            deadline: request_time + reply_timeout,
            processing: BTreeSet::new(),
            confirming_nodes: Vec::new(),
            rejecting_nodes: Vec::new(),
            timed_out_nodes: Vec::new(),
        }
    }

    /// Mark a node as outstanding. Returns false if the node already takes
    /// part in this round.
    pub fn start_processing(&mut self, node: &RemoteNode) -> bool {
        if self.involves(&node.address) {
            return false;
        }
        self.processing.insert(node.address.clone())
    }

    /// Move an outstanding node into the bucket matching `outcome`.
    ///
    /// Discounted nodes leave `processing` without entering any bucket.
    /// Returns false if the node was not outstanding (duplicate or unknown
    /// reply), in which case nothing changes.
    pub fn resolve(&mut self, node: &RemoteNode, outcome: ReplyOutcome) -> bool {
        if !self.processing.remove(&node.address) {
            return false;
        }
        match outcome {
            ReplyOutcome::Confirming => self.confirming_nodes.push(node.clone()),
            ReplyOutcome::Rejecting => self.rejecting_nodes.push(node.clone()),
            ReplyOutcome::TimedOut => self.timed_out_nodes.push(node.clone()),
            ReplyOutcome::Discounted => {}
        }
        true
    }

    /// Does the address appear in any bucket of this round?
    pub fn involves(&self, address: &str) -> bool {
        self.processing.contains(address)
            || self.confirming_nodes.iter().any(|n| n.address == address)
            || self.rejecting_nodes.iter().any(|n| n.address == address)
            || self.timed_out_nodes.iter().any(|n| n.address == address)
    }

    /// All replies resolved?
    pub fn is_complete(&self) -> bool {
        self.processing.is_empty()
    }

    /// Addresses still outstanding.
    pub fn processing(&self) -> impl Iterator<Item = &str> {
        self.processing.iter().map(String::as_str)
    }

    /// Nodes that agreed with the primary.
    pub fn confirming_nodes(&self) -> &[RemoteNode] {
        &self.confirming_nodes
    }

    /// Nodes that disagreed with the primary.
    pub fn rejecting_nodes(&self) -> &[RemoteNode] {
        &self.rejecting_nodes
    }

    /// Nodes that missed the deadline.
    pub fn timed_out_nodes(&self) -> &[RemoteNode] {
        &self.timed_out_nodes
    }

    /// Table row for the rendering layer.
    pub fn to_row(&self) -> HistoryRow {
        let addresses =
            |nodes: &[RemoteNode]| nodes.iter().map(|n| n.address.clone()).collect::<Vec<_>>();
        HistoryRow {
            request_type: self.request_type.clone(),
            requested_at: self.requested_at,
            confirming: addresses(&self.confirming_nodes),
            rejecting: addresses(&self.rejecting_nodes),
            processing: self.processing.iter().cloned().collect(),
            timed_out: addresses(&self.timed_out_nodes),
        }
    }
}

/// Newest-first, bounded history of confirmation rounds.
#[derive(Clone, Debug)]
pub struct ConfirmationHistory {
    rounds: VecDeque<ConfirmationRound>,
    max_rounds: usize,
    retention: Duration,
}

impl ConfirmationHistory {
    /// Create an empty history.
    pub fn new(max_rounds: usize, retention: Duration) -> Self {
        Self {
            rounds: VecDeque::with_capacity(max_rounds + 1),
            max_rounds,
            retention,
        }
    }

    /// Insert a round at the front, then evict rounds older than the
    /// retention window (relative to the newest round) and rounds beyond the
    /// capacity.
    ///
    /// Returns the number of evicted rounds.
    pub fn insert(&mut self, round: ConfirmationRound) -> usize {
        let before = self.rounds.len() + 1;
        self.rounds.push_front(round);

        let newest = self.rounds.iter().map(|r| r.request_time).max();
        if let Some(cutoff) = newest.and_then(|t| t.checked_sub(self.retention)) {
            self.rounds.retain(|r| r.request_time >= cutoff);
        }
        self.rounds.truncate(self.max_rounds);

        before - self.rounds.len()
    }

    /// Mutable access to a round still held by the history.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut ConfirmationRound> {
        self.rounds.iter_mut().find(|r| r.id == *id)
    }

    /// Shared access to a round still held by the history.
    pub fn get(&self, id: &Uuid) -> Option<&ConfirmationRound> {
        self.rounds.iter().find(|r| r.id == *id)
    }

    /// Rounds, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConfirmationRound> {
        self.rounds.iter()
    }

    /// Rows for the history table, newest first.
    pub fn rows(&self) -> Vec<HistoryRow> {
        self.rounds.iter().map(ConfirmationRound::to_row).collect()
    }

    /// Number of rounds held.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Is the history empty?
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

/// Textual history row.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct HistoryRow {
    /// Request type, suffix included.
    pub request_type: String,
    /// When the round started.
    pub requested_at: DateTime<Utc>,
    /// Confirming node addresses.
    pub confirming: Vec<String>,
    /// Rejecting node addresses.
    pub rejecting: Vec<String>,
    /// Outstanding node addresses.
    pub processing: Vec<String>,
    /// Timed-out node addresses.
    pub timed_out: Vec<String>,
}

impl fmt::Display for HistoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<28} confirmed: [{}] rejected: [{}]",
            self.requested_at.format("%H:%M:%S"),
            self.request_type,
            self.confirming.join(", "),
            self.rejecting.join(", "),
        )?;
        if !self.processing.is_empty() {
            write!(f, " pending: [{}]", self.processing.join(", "))?;
        }
        if !self.timed_out.is_empty() {
            write!(f, " timed out: [{}]", self.timed_out.join(", "))?;
        }
        Ok(())
    }
}
