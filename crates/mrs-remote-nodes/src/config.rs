//! # Confirmation Configuration
//!
//! Configuration for the confirmation service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{
    ConfirmationError, TrustPalette, DEFAULT_VALIDATORS_COUNT, HISTORY_RETENTION,
    MAX_HISTORY_ROUNDS, PEER_SIMILARITY_PERCENT, REJECTION_WEIGHT,
};

/// Confirmation service configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Whether a remote node registry is in use. When false no request is
    /// ever confirmed.
    pub enabled: bool,

    /// Validator nodes queried per confirmed request.
    pub validators_count: usize,

    /// Maximum rounds kept in the history.
    pub max_history: usize,

    /// Rounds older than this (relative to the newest) are evicted.
    pub retention_secs: u64,

    /// Validators that have not replied after this long are timed out.
    pub reply_timeout_secs: u64,

    /// Peer lists must share strictly more than this percentage.
    pub peer_similarity_percent: u8,

    /// Multiplier applied to the rejection ratio.
    pub rejection_weight: f64,

    /// Interval of the background peer list refresh.
    pub peer_refresh_secs: u64,

    /// Trust indicator colors.
    pub palette: TrustPalette,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validators_count: DEFAULT_VALIDATORS_COUNT,
            max_history: MAX_HISTORY_ROUNDS,
            retention_secs: HISTORY_RETENTION.as_secs(),
            reply_timeout_secs: 30,
            peer_similarity_percent: PEER_SIMILARITY_PERCENT,
            rejection_weight: REJECTION_WEIGHT,
            peer_refresh_secs: 300,
            palette: TrustPalette::default(),
        }
    }
}

impl ConfirmationConfig {
    /// Create a config for testing (short timeouts).
    pub fn for_testing() -> Self {
        Self {
            reply_timeout_secs: 2,
            peer_refresh_secs: 1,
            ..Self::default()
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.max_history == 0 {
            return Err(ConfirmationError::InvalidConfig(
                "max_history cannot be 0".into(),
            ));
        }
        if self.reply_timeout_secs == 0 {
            return Err(ConfirmationError::InvalidConfig(
                "reply_timeout_secs cannot be 0".into(),
            ));
        }
        if self.peer_similarity_percent > 100 {
            return Err(ConfirmationError::InvalidConfig(format!(
                "peer_similarity_percent must be <= 100, got {}",
                self.peer_similarity_percent
            )));
        }
        if !self.rejection_weight.is_finite() || self.rejection_weight < 0.0 {
            return Err(ConfirmationError::InvalidConfig(format!(
                "rejection_weight must be a non-negative number, got {}",
                self.rejection_weight
            )));
        }
        if self.peer_refresh_secs == 0 {
            return Err(ConfirmationError::InvalidConfig(
                "peer_refresh_secs cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Retention window.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Per-validator reply deadline.
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    /// Peer refresh interval.
    pub fn peer_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.peer_refresh_secs)
    }
}
