//! Peer list source backed by the primary node's `getPeers` request.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ConfirmationError, RemoteNode};
use crate::ports::outbound::{PeerSource, RequestDispatcher, RequestParams, SendOptions};

/// Fetches the active peers of the primary node.
pub struct HttpPeerSource<D> {
    dispatcher: Arc<D>,
}

impl<D: RequestDispatcher> HttpPeerSource<D> {
    /// Create a peer source over a dispatcher.
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self { dispatcher }
    }
}

/// Extract peers from a `getPeers` reply. Entries are either bare addresses
/// or peer info objects; unparseable entries are skipped.
pub(crate) fn parse_peers(reply: &Value) -> Result<Vec<RemoteNode>, ConfirmationError> {
    let entries = reply
        .get("peers")
        .and_then(Value::as_array)
        .ok_or_else(|| ConfirmationError::MalformedResponse {
            request_type: "getPeers".to_string(),
            reason: "missing peers array".to_string(),
        })?;

    let peers = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(address) => Some(RemoteNode::new(address.as_str())),
            Value::Object(_) => match serde_json::from_value::<RemoteNode>(entry.clone()) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable peer entry");
                    None
                }
            },
            _ => None,
        })
        .collect();
    Ok(peers)
}

#[async_trait]
impl<D: RequestDispatcher> PeerSource for HttpPeerSource<D> {
    async fn fetch_peers(&self) -> Result<Vec<RemoteNode>, ConfirmationError> {
        let params: RequestParams = [("active", "true"), ("includePeerInfo", "true")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let reply = self
            .dispatcher
            .send("getPeers", &params, &SendOptions::primary())
            .await?;
        if let Some(e) = ConfirmationError::from_error_payload("primary", &reply) {
            return Err(e);
        }

        let peers = parse_peers(&reply)?;
        debug!(count = peers.len(), "Fetched peer list from primary");
        Ok(peers)
    }
}
