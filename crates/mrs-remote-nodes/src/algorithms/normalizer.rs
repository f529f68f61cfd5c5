//! # Response Normalizer
//!
//! Removes fields that legitimately differ between two honest nodes (or
//! between two observations of the same node) so that responses can be
//! compared as canonical strings.

use serde_json::{Map, Value};

use crate::domain::{ConfirmationError, RequestKind};

/// Attachment kinds whose content nodes may prune, leaving only hashes.
pub const PRUNABLE_ATTACHMENT_KINDS: [&str; 4] = [
    "PrunablePlainMessage",
    "PrunableEncryptedMessage",
    "TaggedDataUpload",
    "TaggedDataExtend",
];

/// Top-level fields stripped from every response.
const VOLATILE_FIELDS: [&str; 2] = ["requestProcessingTime", "confirmations"];

/// Fields of a blockchain status response that must agree across nodes.
const STABLE_STATUS_FIELDS: [&str; 2] = ["application", "isTestnet"];

/// A response with volatile fields removed.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedResponse {
    kind: RequestKind,
    value: Value,
    canonical: String,
}

impl NormalizedResponse {
    /// Normalization family.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Normalized JSON value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical serialization (object keys sorted).
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Normalize a response for `request_type`. The input is never modified.
///
/// # Errors
/// - `MalformedResponse` if the response is not a JSON object
pub fn normalize(
    request_type: &str,
    response: &Value,
) -> Result<NormalizedResponse, ConfirmationError> {
    let kind = RequestKind::from_request_type(request_type);

    if kind == RequestKind::NodeState {
        return Ok(finish(kind, Value::String("getState".to_string())));
    }

    let Value::Object(original) = response else {
        return Err(ConfirmationError::MalformedResponse {
            request_type: request_type.to_string(),
            reason: format!("expected a JSON object, got {}", json_type(response)),
        });
    };

    let mut map = original.clone();
    for field in VOLATILE_FIELDS {
        map.remove(field);
    }

    if let Some(Value::Array(transactions)) = map.get_mut("transactions") {
        transactions.iter_mut().for_each(normalize_transaction);
    }

    let value = match kind {
        RequestKind::Block => {
            map.remove("nextBlock");
            Value::Object(map)
        }
        RequestKind::AccountLedger => {
            if let Some(Value::Array(entries)) = map.get_mut("entries") {
                for entry in entries.iter_mut() {
                    if let Value::Object(entry) = entry {
                        entry.remove("ledgerId");
                    }
                }
            }
            Value::Object(map)
        }
        RequestKind::BlockchainStatus => Value::Object(
            STABLE_STATUS_FIELDS
                .iter()
                .filter_map(|field| map.remove(*field).map(|v| (field.to_string(), v)))
                .collect(),
        ),
        RequestKind::NodeState | RequestKind::Peers | RequestKind::Generic => Value::Object(map),
    };

    Ok(finish(kind, value))
}

/// Strip per-transaction volatile data in place.
fn normalize_transaction(transaction: &mut Value) {
    let Value::Object(transaction) = transaction else {
        return;
    };
    transaction.remove("confirmations");
    if let Some(Value::Object(attachment)) = transaction.get_mut("attachment") {
        redact_prunable_attachment(attachment);
    }
}

/// If the attachment declares a prunable kind (`version.<Kind>` key), keep
/// only the fields whose name ends in "hash" (case-insensitive).
///
/// Returns whether anything was redacted.
pub fn redact_prunable_attachment(attachment: &mut Map<String, Value>) -> bool {
    let prunable = attachment.keys().any(|key| {
        key.strip_prefix("version.")
            .is_some_and(|kind| PRUNABLE_ATTACHMENT_KINDS.contains(&kind))
    });
    if !prunable {
        return false;
    }
    attachment.retain(|key, _| key.to_ascii_lowercase().ends_with("hash"));
    true
}

fn finish(kind: RequestKind, value: Value) -> NormalizedResponse {
    let value = sort_keys(value);
    let canonical = value.to_string();
    NormalizedResponse {
        kind,
        value,
        canonical,
    }
}

/// Rebuild objects with keys in lexicographic order, so the canonical form
/// does not depend on the map implementation serde_json was built with.
pub(crate) fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
