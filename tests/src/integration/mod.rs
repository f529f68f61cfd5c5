//! # Integration Fixtures
//!
//! `SimulatedNetwork` answers node API requests from a per-node view of
//! the chain, so honest nodes agree on stable data while volatile fields
//! (processing time, confirmations) differ between them.

pub mod confirmation_flow;
pub mod trust_indicator;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mrs_remote_nodes::{ConfirmationError, RequestDispatcher, RequestParams, SendOptions};

/// Address the primary node answers on.
pub const PRIMARY: &str = "primary";

/// What one simulated node believes about the chain.
#[derive(Clone, Debug)]
pub struct ChainView {
    pub height: u64,
    pub balances: HashMap<String, u64>,
    pub peers: Vec<String>,
    /// Answer every request with this payload instead.
    pub error: Option<Value>,
    /// Reply latency.
    pub delay: Option<Duration>,
    /// Never reply.
    pub silent: bool,
}

impl ChainView {
    pub fn honest() -> Self {
        Self {
            height: 1_000,
            balances: HashMap::from([("MRS-ALICE".to_string(), 500), ("MRS-BOB".to_string(), 20)]),
            peers: (1..=10).map(|i| format!("10.0.0.{i}")).collect(),
            error: None,
            delay: None,
            silent: false,
        }
    }

    pub fn with_balance(mut self, account: &str, balance: u64) -> Self {
        self.balances.insert(account.to_string(), balance);
        self
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn with_peers(mut self, peers: Vec<String>) -> Self {
        self.peers = peers;
        self
    }

    pub fn failing(mut self, code: i64) -> Self {
        self.error = Some(json!({"errorCode": code, "errorDescription": "Unknown account"}));
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Dispatcher backed by in-memory node views.
#[derive(Default)]
pub struct SimulatedNetwork {
    nodes: RwLock<HashMap<String, ChainView>>,
    counter: AtomicU64,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, address: &str, view: ChainView) -> Self {
        self.set_node(address, view);
        self
    }

    pub fn set_node(&self, address: &str, view: ChainView) {
        self.nodes.write().insert(address.to_string(), view);
    }

    /// Volatile value differing on every reply.
    fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn answer(&self, view: &ChainView, request_type: &str, params: &RequestParams) -> Value {
        if let Some(error) = &view.error {
            return error.clone();
        }
        let processing_time = self.tick();

        let base_type = request_type.split_once('+').map_or(request_type, |(base, _)| base);
        match base_type {
            "getAccount" => {
                let account = params.get("account").cloned().unwrap_or_default();
                let balance = view.balances.get(&account).copied().unwrap_or(0);
                json!({
                    "account": account,
                    "balanceNQT": balance.to_string(),
                    "requestProcessingTime": processing_time,
                })
            }
            "getBlock" => {
                let height: u64 = params
                    .get("height")
                    .and_then(|h| h.parse().ok())
                    .unwrap_or(view.height);
                // Pruned on some nodes, present on others.
                let message = if processing_time % 2 == 0 { "hello" } else { "" };
                json!({
                    "height": height,
                    "block": format!("block-{height}"),
                    "nextBlock": format!("block-{}", height + 1),
                    "requestProcessingTime": processing_time,
                    "transactions": [{
                        "transaction": format!("tx-{height}"),
                        "confirmations": view.height - height,
                        "attachment": {
                            "version.PrunablePlainMessage": 1,
                            "message": message,
                            "messageHash": "ab12",
                        },
                    }],
                })
            }
            "getBlockchainTransactions" => json!({
                "height": view.height,
                "transactions": [{
                    "transaction": "t1",
                    "confirmations": 7 + processing_time,
                }],
            }),
            "getBlockchainStatus" => json!({
                "application": "MRS",
                "isTestnet": false,
                "numberOfBlocks": view.height + 1,
                "lastBlock": format!("block-{}", view.height),
                "time": processing_time,
            }),
            "getAccountLedger" => {
                let entries: Vec<Value> = (0..3)
                    .map(|i| {
                        json!({
                            "ledgerId": processing_time * 10 + i,
                            "height": view.height - i,
                            "change": -(i as i64) * 100,
                        })
                    })
                    .collect();
                json!({ "entries": entries, "requestProcessingTime": processing_time })
            }
            "getPeers" => json!({ "peers": view.peers }),
            "getState" => json!({
                "numberOfPeers": view.peers.len(),
                "time": processing_time,
            }),
            other => json!({"errorCode": 1, "errorDescription": format!("Incorrect request {other}")}),
        }
    }
}

#[async_trait]
impl RequestDispatcher for SimulatedNetwork {
    async fn send(
        &self,
        request_type: &str,
        params: &RequestParams,
        options: &SendOptions,
    ) -> Result<Value, ConfirmationError> {
        let address = options
            .remote_node
            .as_ref()
            .map_or(PRIMARY, |node| node.address.as_str());
        let view = self
            .nodes
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| ConfirmationError::NetworkError(format!("connection refused: {address}")))?;

        if view.silent {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = view.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.answer(&view, request_type, params))
    }
}

/// Request parameters from pairs.
pub fn params(pairs: &[(&str, &str)]) -> RequestParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
