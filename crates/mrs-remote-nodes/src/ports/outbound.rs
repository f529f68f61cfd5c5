//! # Outbound Ports
//!
//! Traits for external dependencies (the node API dispatcher and the peer
//! list source), plus scriptable mocks for tests.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::{ConfirmationError, RemoteNode};

/// Named request parameters, sent as query/form fields.
pub type RequestParams = BTreeMap<String, String>;

/// Per-request dispatch options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Send to this node instead of the primary.
    pub remote_node: Option<RemoteNode>,
    /// Bypass any configured proxy.
    pub no_proxy: bool,
}

impl SendOptions {
    /// Options for a request to the primary node.
    pub fn primary() -> Self {
        Self::default()
    }

    /// Options for a validator request: target node, no proxy.
    pub fn to_node(node: RemoteNode) -> Self {
        Self {
            remote_node: Some(node),
            no_proxy: true,
        }
    }
}

/// Request dispatcher - outbound port.
///
/// A reply carrying `errorCode` is returned as `Ok`; the caller decides how
/// to treat it.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Issue a named request and wait for its JSON reply.
    async fn send(
        &self,
        request_type: &str,
        params: &RequestParams,
        options: &SendOptions,
    ) -> Result<Value, ConfirmationError>;
}

/// Peer list source - outbound port.
#[async_trait]
pub trait PeerSource: Send + Sync {
    /// Fetch the current peer list.
    async fn fetch_peers(&self) -> Result<Vec<RemoteNode>, ConfirmationError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted reply of a mock node.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Answer with this JSON.
    Respond(Value),
    /// Fail at the transport level.
    Fail(String),
    /// Never answer.
    Silent,
}

/// A request seen by the mock dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedCall {
    /// Request type.
    pub request_type: String,
    /// Target node address, `None` for the primary.
    pub node: Option<String>,
    /// Was the proxy bypassed?
    pub no_proxy: bool,
}

/// Mock dispatcher answering per node address.
#[derive(Default)]
pub struct MockDispatcher {
    primary: RwLock<Option<MockReply>>,
    replies: RwLock<HashMap<String, MockReply>>,
    delays: RwLock<HashMap<String, Duration>>,
    calls: Mutex<Vec<DispatchedCall>>,
}

impl MockDispatcher {
    /// Create a mock with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the primary node's reply.
    pub fn with_primary(self, reply: MockReply) -> Self {
        *self.primary.write() = Some(reply);
        self
    }

    /// Script a node's reply.
    pub fn with_reply(self, address: &str, reply: MockReply) -> Self {
        self.set_reply(address, reply);
        self
    }

    /// Delay a node's reply.
    pub fn with_delay(self, address: &str, delay: Duration) -> Self {
        self.delays.write().insert(address.to_string(), delay);
        self
    }

    /// Replace a node's scripted reply.
    pub fn set_reply(&self, address: &str, reply: MockReply) {
        self.replies.write().insert(address.to_string(), reply);
    }

    /// Requests dispatched so far.
    pub fn calls(&self) -> Vec<DispatchedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RequestDispatcher for MockDispatcher {
    async fn send(
        &self,
        request_type: &str,
        _params: &RequestParams,
        options: &SendOptions,
    ) -> Result<Value, ConfirmationError> {
        let address = options.remote_node.as_ref().map(|n| n.address.clone());
        self.calls.lock().push(DispatchedCall {
            request_type: request_type.to_string(),
            node: address.clone(),
            no_proxy: options.no_proxy,
        });

        let (reply, delay) = match &address {
            Some(address) => (
                self.replies.read().get(address).cloned(),
                self.delays.read().get(address).copied(),
            ),
            None => (self.primary.read().clone(), None),
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(MockReply::Respond(value)) => Ok(value),
            Some(MockReply::Fail(reason)) => Err(ConfirmationError::NetworkError(reason)),
            Some(MockReply::Silent) => std::future::pending().await,
            None => Err(ConfirmationError::NetworkError(format!(
                "no route to {}",
                address.as_deref().unwrap_or("primary")
            ))),
        }
    }
}

/// Peer source returning a fixed list.
#[derive(Clone, Debug, Default)]
pub struct StaticPeerSource {
    /// Peers returned on every fetch.
    pub peers: Vec<RemoteNode>,
}

#[async_trait]
impl PeerSource for StaticPeerSource {
    async fn fetch_peers(&self) -> Result<Vec<RemoteNode>, ConfirmationError> {
        Ok(self.peers.clone())
    }
}
