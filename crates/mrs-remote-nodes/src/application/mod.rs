//! # Application Module
//!
//! Confirmation service orchestrating registry, history and validators.

mod service;
mod stats;

pub use service::{ConfirmationService, ConfirmationTicket};
pub use stats::{ConfirmationStats, StatsSnapshot};
