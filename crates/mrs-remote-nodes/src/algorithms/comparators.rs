//! # Response Comparators
//!
//! Decide whether a validator's normalized response agrees with the
//! primary's. Most request kinds use canonical string equality; peer lists
//! and account ledgers have their own rules.

use serde_json::Value;
use std::collections::BTreeSet;

use super::normalizer::{sort_keys, NormalizedResponse};
use crate::domain::RequestKind;

/// Does `actual` agree with `expected`?
pub fn responses_match(
    expected: &NormalizedResponse,
    actual: &NormalizedResponse,
    peer_similarity_percent: u8,
) -> bool {
    match expected.kind() {
        RequestKind::Peers => {
            peers_similar(expected.value(), actual.value(), peer_similarity_percent)
        }
        RequestKind::AccountLedger => ledger_prefix_equal(expected.value(), actual.value()),
        _ => expected.canonical() == actual.canonical(),
    }
}

/// Peer lists are similar when their address sets share strictly more than
/// `threshold_percent` of the smaller set. Two empty lists are similar; an
/// empty list is never similar to a non-empty one.
pub fn peers_similar(a: &Value, b: &Value, threshold_percent: u8) -> bool {
    let a = peer_addresses(a);
    let b = peer_addresses(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => {
            let smaller = a.len().min(b.len());
            let shared = a.intersection(&b).count();
            shared * 100 > usize::from(threshold_percent) * smaller
        }
    }
}

/// Entries are compared position by position up to the shorter list.
///
/// Lists of different lengths are NOT required to match beyond the common
/// prefix. Both lists missing counts as equal, one missing does not.
pub fn ledger_prefix_equal(a: &Value, b: &Value) -> bool {
    let entries = |v: &Value| v.get("entries").and_then(Value::as_array).cloned();
    match (entries(a), entries(b)) {
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
        (Some(a), Some(b)) => a
            .into_iter()
            .zip(b)
            .all(|(x, y)| ledger_entry_canonical(x) == ledger_entry_canonical(y)),
    }
}

fn ledger_entry_canonical(mut entry: Value) -> String {
    if let Value::Object(map) = &mut entry {
        map.remove("ledgerId");
    }
    sort_keys(entry).to_string()
}

/// Addresses of a `getPeers` response; entries are plain strings or
/// peer-info objects.
fn peer_addresses(response: &Value) -> BTreeSet<String> {
    response
        .get("peers")
        .and_then(Value::as_array)
        .map(|peers| {
            peers
                .iter()
                .filter_map(|peer| match peer {
                    Value::String(address) => Some(address.clone()),
                    Value::Object(info) => info
                        .get("address")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
