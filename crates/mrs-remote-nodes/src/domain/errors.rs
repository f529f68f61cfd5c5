//! # Domain Errors
//!
//! Error types for remote node confirmation.
//!
//! Nothing here is fatal to the host application: confirmation is advisory
//! and runs after the primary response has already been delivered.

use thiserror::Error;

/// Confirmation error types.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// The response could not be normalized (not a JSON object).
    #[error("Malformed response for {request_type}: {reason}")]
    MalformedResponse {
        /// Request type the response belongs to
        request_type: String,
        /// What was wrong with it
        reason: String,
    },

    /// The node answered with an `errorCode` payload.
    #[error("Node {node} returned error {code}: {description}")]
    NodeError {
        /// Address of the answering node
        node: String,
        /// API error code
        code: i64,
        /// API error description
        description: String,
    },

    /// Network error while talking to a remote node.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The node did not answer before the round deadline.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// No usable node address could be built.
    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failure.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfirmationError {
    /// Build a `NodeError` from an API error payload, if the payload is one.
    pub fn from_error_payload(node: &str, payload: &serde_json::Value) -> Option<Self> {
        let code = payload.get("errorCode")?;
        Some(Self::NodeError {
            node: node.to_string(),
            code: code.as_i64().unwrap_or(-1),
            description: payload
                .get("errorDescription")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        })
    }
}
