//! Prometheus metrics for remote node confirmation.
//!
//! All metrics follow the naming convention: `mrs_confirmation_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Confirmation rounds started
    pub static ref CONFIRMATION_ROUNDS: Counter = Counter::new(
        "mrs_confirmation_rounds_total",
        "Total confirmation rounds started"
    ).expect("metric creation failed");

    /// Validator replies by outcome
    pub static ref VALIDATOR_REPLIES: CounterVec = CounterVec::new(
        Opts::new("mrs_confirmation_replies_total", "Validator replies by outcome"),
        &["outcome"]  // confirming/rejecting/discounted/timed_out
    ).expect("metric creation failed");

    /// Replies that arrived after their round was evicted
    pub static ref LATE_REPLIES: Counter = Counter::new(
        "mrs_confirmation_late_replies_total",
        "Validator replies discarded because their round was evicted"
    ).expect("metric creation failed");

    /// Current weighted rejection ratio
    pub static ref REJECTION_RATIO: Gauge = Gauge::new(
        "mrs_confirmation_rejection_ratio",
        "Weighted rejection ratio over the confirmation history (0..1)"
    ).expect("metric creation failed");

    /// Nodes in the registry
    pub static ref KNOWN_NODES: Gauge = Gauge::new(
        "mrs_confirmation_known_nodes",
        "Number of remote nodes in the registry"
    ).expect("metric creation failed");

    /// Time until every validator of a round has replied or timed out
    pub static ref ROUND_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "mrs_confirmation_round_duration_seconds",
            "Time from dispatch until the round has no outstanding validators"
        ).buckets(exponential_buckets(0.01, 2.0, 13).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle on the registry holding the confirmation metrics
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Encode the registry as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONFIRMATION_ROUNDS.clone()),
        Box::new(VALIDATOR_REPLIES.clone()),
        Box::new(LATE_REPLIES.clone()),
        Box::new(REJECTION_RATIO.clone()),
        Box::new(KNOWN_NODES.clone()),
        Box::new(ROUND_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
