//! # Confirmation Service
//!
//! Application service owning the node registry and the confirmation
//! history. One instance per process; clones share state.
//!
//! Flow of one confirmed request:
//! 1. Host receives the primary node's response and calls `confirm()`
//! 2. The primary response is normalized into the expected canonical form
//! 3. A round is pushed to the history, old rounds are evicted
//! 4. One task per validator replays the request with a deadline
//! 5. Each reply is classified and recorded, and the trust signal republished

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::stats::{ConfirmationStats, StatsSnapshot};
use crate::algorithms::{compute_trust, normalize, responses_match, NormalizedResponse};
use crate::config::ConfirmationConfig;
use crate::domain::{
    is_confirmable, ConfirmationError, ConfirmationHistory, ConfirmationRound, HistoryRow,
    NodeRegistry, RemoteNode, ReplyOutcome, TrustSignal,
};
use crate::ports::{ConfirmationApi, PeerSource, RequestDispatcher, RequestParams, SendOptions};

/// Handle on a started confirmation round.
#[derive(Debug)]
pub struct ConfirmationTicket {
    round_id: Uuid,
    tasks: Vec<JoinHandle<()>>,
}

impl ConfirmationTicket {
    /// Identifier of the round in the history.
    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    /// Number of validators queried.
    pub fn validator_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every validator has replied or timed out.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(round_id = %self.round_id, error = %e, "Validator task failed");
            }
        }
    }
}

/// Confirmation Service - cross-checks primary responses.
pub struct ConfirmationService<D: RequestDispatcher> {
    inner: Arc<Inner<D>>,
}

impl<D: RequestDispatcher> Clone for ConfirmationService<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<D> {
    /// Configuration.
    config: ConfirmationConfig,
    /// Node API access.
    dispatcher: Arc<D>,
    /// Known remote nodes.
    registry: RwLock<NodeRegistry>,
    /// Recent rounds, newest first.
    history: Mutex<ConfirmationHistory>,
    /// Latest trust signal.
    trust_tx: watch::Sender<TrustSignal>,
    /// Counters.
    stats: ConfirmationStats,
}

impl<D: RequestDispatcher + 'static> ConfirmationService<D> {
    /// Create a new confirmation service.
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    pub fn new(config: ConfirmationConfig, dispatcher: Arc<D>) -> Result<Self, ConfirmationError> {
        config.validate()?;
        let history = ConfirmationHistory::new(config.max_history, config.retention());
        let (trust_tx, _) = watch::channel(TrustSignal::neutral(&config.palette));

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                dispatcher,
                registry: RwLock::new(NodeRegistry::new()),
                history: Mutex::new(history),
                trust_tx,
                stats: ConfirmationStats::default(),
            }),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConfirmationConfig {
        &self.inner.config
    }

    /// Number of known nodes.
    pub fn node_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Exclude a node from future validator selection.
    pub fn blacklist_node(&self, address: &str) -> bool {
        let found = self.inner.registry.write().blacklist(address);
        if found {
            info!(node = address, "Blacklisted remote node");
        }
        found
    }

    /// Row of a round still held by the history.
    pub fn round_row(&self, round_id: &Uuid) -> Option<HistoryRow> {
        self.inner.history.lock().get(round_id).map(ConfirmationRound::to_row)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Refresh the node registry from `source` at the configured interval.
    pub fn spawn_peer_refresh<S: PeerSource + 'static>(&self, source: Arc<S>) -> JoinHandle<()> {
        let service = self.clone();
        let period = self.inner.config.peer_refresh_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if let Err(e) = service.refresh_nodes(source.as_ref()).await {
                    warn!(error = %e, "Peer list refresh failed");
                }
            }
        })
    }
}

impl<D: RequestDispatcher + 'static> Inner<D> {
    /// Recompute the trust signal from the history and publish it.
    fn publish_trust(&self) {
        let signal = {
            let history = self.history.lock();
            self.trust_of(&history)
        };
        self.trust_tx.send_replace(signal);
    }

    fn trust_of(&self, history: &ConfirmationHistory) -> TrustSignal {
        compute_trust(
            history.iter(),
            &self.config.palette,
            self.config.rejection_weight,
        )
    }

    /// Replay the request against one validator and record the outcome.
    async fn query_validator(
        self: Arc<Self>,
        round_id: Uuid,
        deadline: Instant,
        request_type: String,
        params: RequestParams,
        node: RemoteNode,
        expected: Arc<NormalizedResponse>,
    ) {
        let options = SendOptions::to_node(node.clone());
        let reply = tokio::time::timeout_at(
            deadline,
            self.dispatcher.send(&request_type, &params, &options),
        )
        .await;

        let outcome = match reply {
            Err(_) => {
                warn!(%round_id, node = %node, request_type, "Validator did not reply before deadline");
                ReplyOutcome::TimedOut
            }
            Ok(Err(e)) => {
                warn!(%round_id, node = %node, request_type, error = %e, "Validator request failed");
                ReplyOutcome::Discounted
            }
            Ok(Ok(reply)) => self.classify(&request_type, &node, &reply, &expected),
        };

        self.record_reply(round_id, &node, outcome);
    }

    fn classify(
        &self,
        request_type: &str,
        node: &RemoteNode,
        reply: &Value,
        expected: &NormalizedResponse,
    ) -> ReplyOutcome {
        if let Some(e) = ConfirmationError::from_error_payload(&node.address, reply) {
            warn!(error = %e, request_type, "Validator returned an error reply");
            return ReplyOutcome::Discounted;
        }

        match normalize(request_type, reply) {
            Ok(actual)
                if responses_match(expected, &actual, self.config.peer_similarity_percent) =>
            {
                ReplyOutcome::Confirming
            }
            Ok(actual) => {
                debug!(
                    node = %node,
                    request_type,
                    expected = expected.canonical(),
                    actual = actual.canonical(),
                    "Validator response diverges from primary"
                );
                ReplyOutcome::Rejecting
            }
            Err(e) => {
                warn!(node = %node, error = %e, "Validator response cannot be normalized");
                ReplyOutcome::Rejecting
            }
        }
    }

    fn record_reply(&self, round_id: Uuid, node: &RemoteNode, outcome: ReplyOutcome) {
        let signal = {
            let mut history = self.history.lock();
            let Some(round) = history.get_mut(&round_id) else {
                self.stats
                    .late_discarded
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!(%round_id, node = %node, "Round already evicted, discarding reply");
                return;
            };

            if !round.resolve(node, outcome) {
                debug!(%round_id, node = %node, "Ignoring reply from node not outstanding");
                return;
            }

            if round.is_complete() {
                info!(
                    %round_id,
                    request_type = %round.request_type,
                    confirming = round.confirming_nodes().len(),
                    rejecting = round.rejecting_nodes().len(),
                    timed_out = round.timed_out_nodes().len(),
                    "Confirmation round complete"
                );
            }

            self.trust_of(&history)
        };

        self.stats.record(outcome);
        if signal.has_rejections {
            warn!(
                ratio = signal.rejection_ratio,
                rejections = signal.rejections,
                confirmations = signal.confirmations,
                "Remote node responses rejected by validators"
            );
        }
        self.trust_tx.send_replace(signal);
    }
}

#[async_trait]
impl<D: RequestDispatcher + 'static> ConfirmationApi for ConfirmationService<D> {
    fn needs_confirmation(&self, request_type: &str) -> bool {
        self.inner.config.enabled && is_confirmable(request_type)
    }

    fn confirm(
        &self,
        request_type: &str,
        params: &RequestParams,
        primary_response: &Value,
        primary_node: &RemoteNode,
    ) -> Option<ConfirmationTicket> {
        if !self.needs_confirmation(request_type) {
            return None;
        }

        let expected = match normalize(request_type, primary_response) {
            Ok(normalized) => Arc::new(normalized),
            Err(e) => {
                warn!(request_type, error = %e, "Cannot normalize primary response, skipping confirmation");
                return None;
            }
        };

        let config = &self.inner.config;
        let mut round =
            ConfirmationRound::new(request_type, Instant::now(), config.reply_timeout());
        let validators = self
            .inner
            .registry
            .read()
            .get_random_nodes(config.validators_count, &[primary_node.address.as_str()]);
        for node in &validators {
            round.start_processing(node);
        }

        let round_id = round.id;
        let deadline = round.deadline;
        let evicted = self.inner.history.lock().insert(round);
        self.inner
            .stats
            .rounds_started
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        debug!(
            %round_id,
            request_type,
            primary = %primary_node,
            validators = validators.len(),
            evicted,
            "Started confirmation round"
        );
        if validators.is_empty() {
            info!(request_type, "No eligible validator nodes, round has no votes");
        }
        self.inner.publish_trust();

        let tasks = validators
            .into_iter()
            .map(|node| {
                tokio::spawn(Arc::clone(&self.inner).query_validator(
                    round_id,
                    deadline,
                    request_type.to_string(),
                    params.clone(),
                    node,
                    Arc::clone(&expected),
                ))
            })
            .collect();

        Some(ConfirmationTicket { round_id, tasks })
    }

    fn trust_signal(&self) -> TrustSignal {
        self.inner.trust_tx.borrow().clone()
    }

    fn subscribe_trust(&self) -> watch::Receiver<TrustSignal> {
        self.inner.trust_tx.subscribe()
    }

    fn history_rows(&self) -> Vec<HistoryRow> {
        self.inner.history.lock().rows()
    }

    fn add_nodes(&self, peers: Vec<RemoteNode>) -> usize {
        let added = self.inner.registry.write().add_nodes(peers);
        debug!(added, "Merged peers into node registry");
        added
    }

    async fn refresh_nodes(&self, source: &dyn PeerSource) -> Result<usize, ConfirmationError> {
        let peers = source.fetch_peers().await?;
        let count = peers.len();
        self.inner.registry.write().refresh(peers);
        info!(count, "Node registry refreshed");
        Ok(count)
    }
}
