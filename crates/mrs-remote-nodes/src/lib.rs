//! # MRS Remote Node Confirmation
//!
//! Cross-checks responses from an untrusted remote node against a few
//! randomly chosen validator nodes and aggregates the outcome into an
//! advisory trust indicator.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A light wallet talks to one remote node it does not control. Every
//! read-only request answered by that node is replayed against other
//! nodes; divergent answers raise the trust indicator from neutral towards
//! danger. Confirmation never blocks or alters the primary response.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | Node registry | Known peers, blacklist, random validator selection |
//! | Normalizer | Strips volatile fields so honest replies compare equal |
//! | Coordinator | Rounds, per-validator deadlines, bounded history |
//! | Trust indicator | Weighted rejection ratio mapped onto a color |
//!
//! ## Module Structure
//!
//! ```text
//! mrs-remote-nodes/
//! ├── domain/          # RemoteNode, ConfirmationRound, history, errors
//! ├── algorithms/      # Normalization, comparators, trust aggregation
//! ├── ports/           # API traits (inbound) + dependency traits (outbound)
//! ├── application/     # ConfirmationService orchestrating everything
//! ├── adapters/        # HTTP dispatcher and peer source (feature "http")
//! └── config.rs        # ConfirmationConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(feature = "http")]
pub mod adapters;

// Re-exports
pub use algorithms::{compute_trust, normalize, responses_match, NormalizedResponse};
pub use application::{ConfirmationService, ConfirmationTicket, StatsSnapshot};
pub use config::ConfirmationConfig;
pub use domain::{
    is_confirmable, ConfirmationError, ConfirmationHistory, ConfirmationRound, HistoryRow,
    NodeRegistry, RemoteNode, ReplyOutcome, RequestKind, Rgb, TrustPalette, TrustSignal,
};
pub use ports::{
    ConfirmationApi, MockDispatcher, MockReply, PeerSource, RequestDispatcher, RequestParams,
    SendOptions, StaticPeerSource,
};

#[cfg(feature = "http")]
pub use adapters::{HttpConfig, HttpDispatcher, HttpPeerSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
