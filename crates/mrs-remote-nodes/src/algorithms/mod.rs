//! # Algorithms Module
//!
//! Response normalization, comparison and trust aggregation.

pub mod comparators;
pub mod normalizer;
pub mod trust;

pub use comparators::{ledger_prefix_equal, peers_similar, responses_match};
pub use normalizer::{
    normalize, redact_prunable_attachment, NormalizedResponse, PRUNABLE_ATTACHMENT_KINDS,
};
pub use trust::{compute_trust, trust_from_counts};
