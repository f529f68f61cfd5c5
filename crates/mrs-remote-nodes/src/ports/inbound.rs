//! # Inbound Ports
//!
//! API trait defining what the confirmation layer offers its host.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use super::outbound::{PeerSource, RequestParams};
use crate::application::ConfirmationTicket;
use crate::domain::{ConfirmationError, HistoryRow, RemoteNode, TrustSignal};

/// Confirmation API - inbound port.
#[async_trait]
pub trait ConfirmationApi: Send + Sync {
    /// Should a request of this type be cross-checked?
    fn needs_confirmation(&self, request_type: &str) -> bool;

    /// Cross-check a primary response against validator nodes.
    ///
    /// Returns immediately after dispatching; `None` when the request is not
    /// confirmed at all.
    fn confirm(
        &self,
        request_type: &str,
        params: &RequestParams,
        primary_response: &Value,
        primary_node: &RemoteNode,
    ) -> Option<ConfirmationTicket>;

    /// Current aggregate trust signal.
    fn trust_signal(&self) -> TrustSignal;

    /// Receive every republished trust signal.
    fn subscribe_trust(&self) -> watch::Receiver<TrustSignal>;

    /// History table, newest first.
    fn history_rows(&self) -> Vec<HistoryRow>;

    /// Merge peers into the node registry.
    fn add_nodes(&self, peers: Vec<RemoteNode>) -> usize;

    /// Replace the node registry with the source's current peer list.
    async fn refresh_nodes(&self, source: &dyn PeerSource) -> Result<usize, ConfirmationError>;
}
