//! Error types for the connectivity core.
//!
//! None of these are runtime failures of the connectivity logic itself: a
//! degraded or dead link, an exhausted retry budget and an expired session are
//! all expected outcomes reported through state. Errors here cover invalid
//! configuration and malformed input that must be rejected at the boundary.

use std::time::Duration;

use thiserror::Error;

/// Invalid connectivity configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A duration that must be positive was zero
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Configuration field name
        field: &'static str,
    },

    /// Rolling window cannot hold the minimum number of samples
    #[error("window size {window_size} is smaller than min_samples {min_samples}")]
    WindowTooSmall {
        /// Configured window size
        window_size: usize,
        /// Samples required before classification
        min_samples: usize,
    },

    /// A tier's exit threshold is not above its enter threshold
    #[error("{tier} threshold has exit {exit_ms}ms <= enter {enter_ms}ms")]
    InvertedThreshold {
        /// Tier name
        tier: &'static str,
        /// Enter threshold
        enter_ms: f64,
        /// Exit threshold
        exit_ms: f64,
    },

    /// Tier thresholds do not worsen monotonically
    #[error("{worse} thresholds must exceed {better} thresholds")]
    UnorderedTiers {
        /// Better tier name
        better: &'static str,
        /// Worse tier name
        worse: &'static str,
    },

    /// A ratio is outside its allowed range
    #[error("{field} must be within [0, {max}], got {value}")]
    RatioOutOfRange {
        /// Configuration field name
        field: &'static str,
        /// Configured value
        value: f64,
        /// Upper bound
        max: f64,
    },

    /// A duration is longer than any instant arithmetic should ever see
    #[error("{field} of {value:?} exceeds the limit of {max:?}")]
    DurationTooLong {
        /// Configuration field name
        field: &'static str,
        /// Configured value
        value: Duration,
        /// Upper bound
        max: Duration,
    },

    /// Backoff base delay is above the cap
    #[error("base delay {base:?} exceeds max delay {max:?}")]
    BaseAboveMax {
        /// Base delay
        base: Duration,
        /// Max delay
        max: Duration,
    },

    /// Retry budget of zero would fail without trying
    #[error("max_attempts must be at least 1")]
    NoAttempts,
}

/// Rejected transport statistics reading.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SampleError {
    /// Metric is NaN or infinite
    #[error("{metric} is not finite: {value}")]
    NonFinite {
        /// Metric name
        metric: &'static str,
        /// Raw value
        value: f64,
    },

    /// Metric is negative
    #[error("{metric} is negative: {value}")]
    Negative {
        /// Metric name
        metric: &'static str,
        /// Raw value
        value: f64,
    },
}

impl SampleError {
    /// Metric name that failed validation.
    pub fn metric(&self) -> &'static str {
        match self {
            Self::NonFinite { metric, .. } | Self::Negative { metric, .. } => metric,
        }
    }
}
