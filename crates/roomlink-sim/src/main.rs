//! Roomlink connectivity simulator.
//!
//! Replays a call with one congestion window through the real connectivity
//! runtime on a paused clock and logs every published state as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Two minutes with 30 s of heavy congestion starting at 20 s
//! roomlink-sim --seed 7
//!
//! # Token that runs out mid-call, tuned thresholds
//! roomlink-sim --token-lifetime-secs 45 --config roomlink.json --log-level debug
//! ```

mod scenario;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use roomlink_core::{ConnectivityConfig, TransportStats};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::scenario::Scenario;

/// Roomlink connectivity simulator
#[derive(Parser, Debug)]
#[command(name = "roomlink-sim")]
#[command(about = "Replay a scripted link profile through the connectivity runtime")]
#[command(version)]
struct Args {
    /// Seed for backoff jitter
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Call length in seconds
    #[arg(short, long, default_value = "120")]
    duration_secs: u64,

    /// Healthy round-trip time in milliseconds
    #[arg(long, default_value = "40")]
    base_rtt_ms: f64,

    /// Round-trip time during congestion in milliseconds
    #[arg(long, default_value = "650")]
    congested_rtt_ms: f64,

    /// Jitter during congestion in milliseconds
    #[arg(long, default_value = "40")]
    congested_jitter_ms: f64,

    /// Seconds into the call when congestion begins
    #[arg(long, default_value = "20")]
    congestion_start_secs: u64,

    /// Length of the congestion window in seconds
    #[arg(long, default_value = "30")]
    congestion_secs: u64,

    /// Lifetime of the session token in seconds (never expires if omitted)
    #[arg(long)]
    token_lifetime_secs: Option<u64>,

    /// Path to a JSON connectivity config (defaults if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn scenario(&self) -> Scenario {
        Scenario {
            seed: self.seed,
            duration: Duration::from_secs(self.duration_secs),
            healthy: TransportStats::new(self.base_rtt_ms, self.base_rtt_ms / 10.0),
            congested: TransportStats::new(self.congested_rtt_ms, self.congested_jitter_ms),
            congestion_start: Duration::from_secs(self.congestion_start_secs),
            congestion: Duration::from_secs(self.congestion_secs),
            token_lifetime: self.token_lifetime_secs.map(Duration::from_secs),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = match &args.config {
        Some(path) => scenario::load_config(path)?,
        None => ConnectivityConfig::default(),
    };
    let scenario = args.scenario();

    tracing::info!(seed = scenario.seed, duration = ?scenario.duration, "simulation starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let report = runtime.block_on(scenario::run(&scenario, config))?;

    for (index, state) in report.published.iter().enumerate() {
        tracing::info!(index, state = %serde_json::to_string(state)?, "published");
    }
    tracing::info!(
        attempts = ?report.reestablish_attempts,
        final_state = %serde_json::to_string(&report.final_state)?,
        "simulation finished"
    );

    Ok(())
}
