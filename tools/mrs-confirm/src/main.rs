//! mrs-confirm: query an MRS node and cross-check the answer.
//!
//! Sends one request to the primary node, replays it against validator
//! nodes taken from the primary's peer list, then prints the confirmation
//! history and the resulting trust indicator.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use mrs_remote_nodes::{
    ConfirmationApi, ConfirmationError, ConfirmationService, HttpDispatcher, HttpPeerSource,
    RemoteNode, RequestDispatcher, RequestParams, SendOptions, StatsSnapshot, TrustSignal,
};
use mrs_telemetry::{
    init_telemetry, HistogramTimer, TelemetryConfig, CONFIRMATION_ROUNDS, KNOWN_NODES,
    LATE_REPLIES, REJECTION_RATIO, ROUND_DURATION, VALIDATOR_REPLIES,
};

use config::CliConfig;

/// Exit code when validators rejected the primary's answers.
const EXIT_REJECTED: u8 = 2;

/// mrs-confirm: cross-check an MRS node against its peers
#[derive(Parser, Debug)]
#[command(name = "mrs-confirm")]
#[command(about = "Query an MRS node and confirm the answer with validator nodes")]
struct Args {
    /// Primary node address (host name or IP)
    #[arg(short, long, default_value = "127.0.0.1")]
    node: String,

    /// API port of the primary node
    #[arg(long)]
    api_port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request type to send
    #[arg(short, long, default_value = "getBlockchainStatus")]
    request_type: String,

    /// Request parameter, repeatable (key=value)
    #[arg(short, long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// Validator node address, repeatable; replaces the primary's peer list
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Number of validators to query
    #[arg(short, long)]
    validators: Option<usize>,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    metrics: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let mut config = CliConfig::load(args.config.as_deref())?;
    if let Some(count) = args.validators {
        config.confirmation.validators_count = count;
    }

    let mut primary = RemoteNode::new(args.node.as_str());
    if let Some(port) = args.api_port {
        primary = primary.with_api_port(port);
    }

    let dispatcher = Arc::new(
        HttpDispatcher::new(config.http, primary.clone())
            .context("Failed to create HTTP dispatcher")?,
    );
    let service = ConfirmationService::new(config.confirmation, Arc::clone(&dispatcher))?;

    if args.peers.is_empty() {
        let source = HttpPeerSource::new(Arc::clone(&dispatcher));
        service
            .refresh_nodes(&source)
            .await
            .context("Failed to fetch peer list from primary node")?;
    } else {
        service.add_nodes(args.peers.iter().map(|p| RemoteNode::new(p.as_str())).collect());
    }
    KNOWN_NODES.set(service.node_count() as f64);
    info!(nodes = service.node_count(), "Node registry ready");

    let params: RequestParams = args.params.into_iter().collect();
    let response = dispatcher
        .send(&args.request_type, &params, &SendOptions::primary())
        .await
        .with_context(|| format!("{} request to {primary} failed", args.request_type))?;
    if let Some(e) = ConfirmationError::from_error_payload(&primary.address, &response) {
        bail!(e);
    }
    println!("{}", serde_json::to_string_pretty(&response)?);

    let Some(ticket) = service.confirm(&args.request_type, &params, &response, &primary) else {
        println!("{} is not confirmed by validators", args.request_type);
        return Ok(ExitCode::SUCCESS);
    };

    {
        let _timer = HistogramTimer::new(&ROUND_DURATION);
        ticket.wait().await;
    }

    println!();
    for row in service.history_rows() {
        println!("{row}");
    }

    let signal = service.trust_signal();
    record_metrics(&service.stats(), &signal);
    print_trust(&signal);

    if args.metrics {
        println!();
        print!("{}", telemetry.metrics().encode()?);
    }

    Ok(if signal.has_rejections {
        ExitCode::from(EXIT_REJECTED)
    } else {
        ExitCode::SUCCESS
    })
}

fn record_metrics(stats: &StatsSnapshot, signal: &TrustSignal) {
    CONFIRMATION_ROUNDS.inc_by(stats.rounds_started as f64);
    for (outcome, count) in [
        ("confirming", stats.confirming),
        ("rejecting", stats.rejecting),
        ("discounted", stats.discounted),
        ("timed_out", stats.timed_out),
    ] {
        VALIDATOR_REPLIES
            .with_label_values(&[outcome])
            .inc_by(count as f64);
    }
    LATE_REPLIES.inc_by(stats.late_discarded as f64);
    REJECTION_RATIO.set(signal.rejection_ratio);
}

fn print_trust(signal: &TrustSignal) {
    println!();
    println!(
        "trust: {} ratio {:.2} ({} confirmations, {} rejections)",
        signal.color.to_hex(),
        signal.rejection_ratio,
        signal.confirmations,
        signal.rejections
    );
    if signal.has_rejections {
        println!("warning: validator nodes disagree with the primary node");
    }
}
