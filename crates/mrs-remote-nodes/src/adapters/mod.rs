//! # Adapters Layer (Hexagonal Architecture)
//!
//! HTTP implementations of the outbound ports, talking to MRS nodes over
//! their JSON API.

mod http_dispatcher;
mod peer_source;

pub use http_dispatcher::{HttpConfig, HttpDispatcher};
pub use peer_source::HttpPeerSource;
