//! # Request Classification
//!
//! Which node API requests may be replayed against validator nodes, and
//! which normalization rule applies to each of them.
//!
//! A request type may carry an option suffix after `+` (for example
//! `getBlock+withTransactions`); classification always uses the base name.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Normalization/comparison family of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// `getBlock`: the `nextBlock` link changes as the chain grows.
    Block,
    /// `getAccountLedger`: entries carry node-assigned `ledgerId`s and are
    /// compared by their common prefix.
    AccountLedger,
    /// `getBlockchainStatus`: only `application` and `isTestnet` are stable.
    BlockchainStatus,
    /// `getState`: not meaningfully comparable, always passes.
    NodeState,
    /// `getPeers`: compared by address-set overlap.
    Peers,
    /// Any other forwardable read.
    Generic,
}

impl RequestKind {
    /// Classify a request type (suffix allowed).
    pub fn from_request_type(request_type: &str) -> Self {
        match base_request_type(request_type) {
            "getBlock" => RequestKind::Block,
            "getAccountLedger" => RequestKind::AccountLedger,
            "getBlockchainStatus" => RequestKind::BlockchainStatus,
            "getState" => RequestKind::NodeState,
            "getPeers" => RequestKind::Peers,
            _ => RequestKind::Generic,
        }
    }
}

/// Strip the `+option` suffix from a request type.
pub fn base_request_type(request_type: &str) -> &str {
    request_type
        .split_once('+')
        .map_or(request_type, |(base, _)| base)
}

/// Request metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    /// API request type (e.g., "getBlock")
    pub name: &'static str,
    /// Safe to replay verbatim against other nodes?
    pub forwardable: bool,
    /// Does the node require POST (state-mutating)?
    pub requires_post: bool,
}

impl RequestInfo {
    /// Read-only request that other nodes answer identically.
    const fn read(name: &'static str) -> Self {
        Self {
            name,
            forwardable: true,
            requires_post: false,
        }
    }

    /// Read-only request bound to the answering node's local state.
    const fn local(name: &'static str) -> Self {
        Self {
            name,
            forwardable: false,
            requires_post: false,
        }
    }

    /// State-mutating request.
    const fn write(name: &'static str) -> Self {
        Self {
            name,
            forwardable: false,
            requires_post: true,
        }
    }
}

/// Request registry - known request types with metadata.
pub static REQUEST_REGISTRY: LazyLock<HashMap<&'static str, RequestInfo>> =
    LazyLock::new(|| {
        let requests = [
            // --- Chain ---
            RequestInfo::read("getBlock"),
            RequestInfo::read("getBlockId"),
            RequestInfo::read("getBlocks"),
            RequestInfo::read("getBlockchainStatus"),
            RequestInfo::read("getBlockchainTransactions"),
            RequestInfo::read("getTransaction"),
            RequestInfo::read("getConstants"),
            RequestInfo::read("getState"),
            RequestInfo::read("getPeers"),
            // --- Accounts ---
            RequestInfo::read("getAccount"),
            RequestInfo::read("getAccountPublicKey"),
            RequestInfo::read("getAccountBlockCount"),
            RequestInfo::read("getAccountBlockIds"),
            RequestInfo::read("getAccountBlocks"),
            RequestInfo::read("getAccountLedger"),
            RequestInfo::read("getAccountLedgerEntry"),
            RequestInfo::read("getAccountLessors"),
            RequestInfo::read("getBalance"),
            RequestInfo::read("getGuaranteedBalance"),
            // --- Aliases / assets / trading ---
            RequestInfo::read("getAlias"),
            RequestInfo::read("getAliases"),
            RequestInfo::read("getAsset"),
            RequestInfo::read("getAssets"),
            RequestInfo::read("getAccountAssets"),
            RequestInfo::read("getAskOrders"),
            RequestInfo::read("getBidOrders"),
            RequestInfo::read("getTrades"),
            RequestInfo::read("getExecutedTransactions"),
            // --- Prunable data ---
            RequestInfo::read("getPrunableMessage"),
            RequestInfo::read("getPrunableMessages"),
            RequestInfo::read("getTaggedData"),
            // --- Node local ---
            RequestInfo::local("getMyInfo"),
            RequestInfo::local("getForging"),
            RequestInfo::local("getAccountId"),
            RequestInfo::local("getUnconfirmedTransactions"),
            RequestInfo::local("getUnconfirmedTransactionIds"),
            RequestInfo::local("getTime"),
            RequestInfo::local("decryptFrom"),
            RequestInfo::local("readMessage"),
            // --- State-mutating ---
            RequestInfo::write("sendMoney"),
            RequestInfo::write("sendMessage"),
            RequestInfo::write("broadcastTransaction"),
            RequestInfo::write("setAccountInfo"),
            RequestInfo::write("setAlias"),
            RequestInfo::write("leaseBalance"),
            RequestInfo::write("issueAsset"),
            RequestInfo::write("transferAsset"),
            RequestInfo::write("placeAskOrder"),
            RequestInfo::write("placeBidOrder"),
            RequestInfo::write("cancelAskOrder"),
            RequestInfo::write("cancelBidOrder"),
            RequestInfo::write("uploadTaggedData"),
            RequestInfo::write("startForging"),
            RequestInfo::write("stopForging"),
        ];

        requests.into_iter().map(|r| (r.name, r)).collect()
    });

/// Look up a request type (suffix allowed).
pub fn request_info(request_type: &str) -> Option<&'static RequestInfo> {
    REQUEST_REGISTRY.get(base_request_type(request_type))
}

/// Forwardable and not state-mutating. Unknown request types never qualify.
pub fn is_confirmable(request_type: &str) -> bool {
    request_info(request_type).is_some_and(|info| info.forwardable && !info.requires_post)
}

/// Does the node expect this request as a POST?
pub fn requires_post(request_type: &str) -> bool {
    request_info(request_type).is_some_and(|info| info.requires_post)
}
