//! Roomlink connectivity core
//!
//! Sans-IO state machines that judge the health of a live peer connection,
//! drive reconnection, and arbitrate against session validity.
//!
//! # Architecture
//!
//! Every component is a pure state machine: methods take the current time as
//! input and return results or actions for the caller to execute. Nothing here
//! performs I/O, spawns timers or reads the clock. The [`env::Environment`]
//! trait is the seam through which runtimes supply time and randomness.
//!
//! # Components
//!
//! - [`MetricsSampler`]: fixed-cadence transport statistics ingestion
//! - [`QualityClassifier`]: rolling-window tiering with hysteresis and dwell
//! - [`ReconnectionController`]: backoff/attempt state machine over the pure
//!   [`reconnect::transition`] function
//! - [`SessionGuard`]: sticky session-expiry latch
//! - [`ConnectivityConfig`]: every tunable threshold and timing constant

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod quality;
pub mod reconnect;
pub mod sample;
pub mod session;

pub use config::{
    ClassifierConfig, ConnectivityConfig, JitterCeilings, MAX_CONFIG_DURATION, QualityThresholds,
    ReconnectConfig, SamplerConfig, TierThreshold,
};
pub use env::{Environment, MonotonicInstant};
pub use error::{ConfigError, SampleError};
pub use quality::{ClassifierUpdate, QualityClassifier, QualityTier};
pub use reconnect::{
    ReconnectAction, ReconnectInput, ReconnectPhase, ReconnectionController, ReconnectionState,
    RetryStage, StepContext,
};
pub use sample::{MetricsSample, MetricsSampler, TransportStats};
pub use session::{SessionGuard, SessionValidity};
