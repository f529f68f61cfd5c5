//! # MRS Telemetry
//!
//! Structured logging and Prometheus metrics for the remote node
//! confirmation layer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mrs_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MRS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `MRS_JSON_LOGS` | `false` | JSON formatted logs |
//! | `MRS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `MRS_SERVICE_NAME` | `mrs-wallet` | Service name in the startup log |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    register_metrics, HistogramTimer, MetricsHandle, CONFIRMATION_ROUNDS,
    KNOWN_NODES, LATE_REPLIES, REJECTION_RATIO, ROUND_DURATION, VALIDATOR_REPLIES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Prometheus registration or encoding failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// The returned guard gives access to the metrics registry.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { metrics })
}

/// Keeps telemetry alive for the lifetime of the application.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registry handle.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}
