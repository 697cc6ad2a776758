//! Scripted link profiles replayed through the real runtime.
//!
//! A scenario is a healthy link with one congestion window and an optional
//! token lifetime. It runs on whatever clock the caller's tokio runtime uses;
//! the binary pauses it so minutes of call time replay instantly.

use std::{path::Path, time::Duration};

use roomlink_app::{DriverEvent, RoomConnectivityState, Runtime};
use roomlink_core::{ConfigError, ConnectivityConfig, TransportStats};
use roomlink_harness::{InvariantRegistry, SimDriver, SimDriverError, SimEnv};
use tokio::time::sleep;

/// Errors that stop a scenario.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration file could not be read.
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON for the config schema.
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration values are inconsistent.
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    /// The runtime stopped with a driver error.
    #[error("runtime: {0}")]
    Driver(#[from] SimDriverError),

    /// The runtime task panicked or was cancelled.
    #[error("runtime task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Link profile over the length of one call.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Seed for backoff jitter.
    pub seed: u64,
    /// Length of the call.
    pub duration: Duration,
    /// Link outside the congestion window.
    pub healthy: TransportStats,
    /// Link inside the congestion window.
    pub congested: TransportStats,
    /// When congestion begins.
    pub congestion_start: Duration,
    /// How long congestion lasts.
    pub congestion: Duration,
    /// Lifetime of the token issued at join, if it should run out.
    pub token_lifetime: Option<Duration>,
}

/// What the runtime did during a scenario.
#[derive(Debug, Clone)]
pub struct Report {
    /// State when the call ended.
    pub final_state: RoomConnectivityState,
    /// Every published state, in order.
    pub published: Vec<RoomConnectivityState>,
    /// Attempt numbers of every re-establish request.
    pub reestablish_attempts: Vec<u32>,
}

/// Load a configuration from a JSON file. Missing fields take defaults.
pub fn load_config(path: &Path) -> Result<ConnectivityConfig, SimError> {
    let raw = std::fs::read_to_string(path)?;
    let config: ConnectivityConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

/// Replay `scenario` through a fresh runtime.
pub async fn run(scenario: &Scenario, config: ConnectivityConfig) -> Result<Report, SimError> {
    let (driver, handle) = SimDriver::new();
    let driver = driver.with_invariants(InvariantRegistry::standard(config.reconnect.max_attempts));
    handle.set_link(scenario.healthy.rtt_ms, scenario.healthy.jitter_ms);

    let runtime = Runtime::new(driver, SimEnv::with_seed(scenario.seed), config)?;
    let task = tokio::spawn(runtime.run());

    if let Some(lifetime) = scenario.token_lifetime {
        handle.inject(DriverEvent::TokenRenewed { expires_in: Some(lifetime) });
    }

    let start = scenario.congestion_start.min(scenario.duration);
    let end = (scenario.congestion_start + scenario.congestion).min(scenario.duration);

    sleep(start).await;
    if end > start {
        tracing::info!(at = ?start, rtt_ms = scenario.congested.rtt_ms, "congestion begins");
        handle.set_link(scenario.congested.rtt_ms, scenario.congested.jitter_ms);
        sleep(end - start).await;
        tracing::info!(at = ?end, "congestion ends");
        handle.set_link(scenario.healthy.rtt_ms, scenario.healthy.jitter_ms);
    }
    sleep(scenario.duration - end).await;

    handle.inject(DriverEvent::Leave);
    let final_state = task.await??;

    Ok(Report {
        final_state,
        published: handle.published(),
        reestablish_attempts: handle.reestablish_attempts(),
    })
}
