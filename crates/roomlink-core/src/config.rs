//! Tunable parameters for sampling, classification and reconnection.
//!
//! Every threshold and timing constant the state machines use lives here so
//! tests and deployments can tighten or loosen behavior without touching
//! logic. Defaults are starting points, tunable per deployment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, quality::QualityTier};

/// Cadence at which transport statistics are polled.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// Number of samples in the classifier's rolling window (~10s at default
/// cadence).
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Samples required before the window is classified. Below this the tier is
/// [`QualityTier::Good`].
pub const DEFAULT_MIN_SAMPLES: usize = 2;

/// How long a critical classification must persist before reconnection is
/// requested.
pub const DEFAULT_CRITICAL_DWELL: Duration = Duration::from_secs(6);

/// Relative gap between a tier's enter and exit thresholds.
pub const DEFAULT_HYSTERESIS_MARGIN: f64 = 0.20;

/// First backoff step.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Backoff ceiling.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Symmetric random spread applied to each backoff delay.
pub const DEFAULT_JITTER_RATIO: f64 = 0.20;

/// Failed attempts tolerated before the controller gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Time allowed for a re-establishment attempt to produce a confirmed
/// healthy transport.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for every configured duration. Deadlines are computed as
/// `now + duration`, which must not overflow the instant type.
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Enter/exit pair for one quality tier, in milliseconds of windowed RTT.
///
/// A connection enters the tier (from a worse one) once the average falls to
/// `enter_ms` or below and leaves it (to a worse one) only when the average
/// rises above `exit_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    /// Average RTT at or below which the tier is entered
    pub enter_ms: f64,
    /// Average RTT above which the tier is left
    pub exit_ms: f64,
}

impl TierThreshold {
    /// Threshold with explicit enter and exit values.
    pub const fn new(enter_ms: f64, exit_ms: f64) -> Self {
        Self { enter_ms, exit_ms }
    }

    /// Threshold whose exit sits `margin` (fraction of `enter_ms`) above the
    /// enter value.
    pub fn with_margin(enter_ms: f64, margin: f64) -> Self {
        Self { enter_ms, exit_ms: enter_ms * (1.0 + margin) }
    }

    fn validate(&self, tier: &'static str) -> Result<(), ConfigError> {
        if !(self.exit_ms > self.enter_ms) || self.enter_ms < 0.0 {
            return Err(ConfigError::InvertedThreshold {
                tier,
                enter_ms: self.enter_ms,
                exit_ms: self.exit_ms,
            });
        }
        Ok(())
    }
}

/// RTT thresholds for the three non-fallback tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Excellent tier
    pub excellent: TierThreshold,
    /// Good tier
    pub good: TierThreshold,
    /// Poor tier
    pub poor: TierThreshold,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            excellent: TierThreshold::new(80.0, 100.0),
            good: TierThreshold::new(180.0, 220.0),
            poor: TierThreshold::new(350.0, 420.0),
        }
    }
}

impl QualityThresholds {
    /// Thresholds derived from enter values and a single relative margin.
    pub fn from_margin(excellent_ms: f64, good_ms: f64, poor_ms: f64, margin: f64) -> Self {
        Self {
            excellent: TierThreshold::with_margin(excellent_ms, margin),
            good: TierThreshold::with_margin(good_ms, margin),
            poor: TierThreshold::with_margin(poor_ms, margin),
        }
    }

    /// Threshold for `tier`. `None` for [`QualityTier::Critical`], which is
    /// the fallback.
    pub fn for_tier(&self, tier: QualityTier) -> Option<TierThreshold> {
        match tier {
            QualityTier::Excellent => Some(self.excellent),
            QualityTier::Good => Some(self.good),
            QualityTier::Poor => Some(self.poor),
            QualityTier::Critical => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.excellent.validate("excellent")?;
        self.good.validate("good")?;
        self.poor.validate("poor")?;

        let ordered = |better: TierThreshold, worse: TierThreshold| {
            worse.enter_ms > better.enter_ms && worse.exit_ms > better.exit_ms
        };
        if !ordered(self.excellent, self.good) {
            return Err(ConfigError::UnorderedTiers { better: "excellent", worse: "good" });
        }
        if !ordered(self.good, self.poor) {
            return Err(ConfigError::UnorderedTiers { better: "good", worse: "poor" });
        }
        Ok(())
    }
}

/// Windowed jitter above which an ambiguous RTT reading worsens the tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterCeilings {
    /// Ceiling while excellent
    pub excellent_ms: f64,
    /// Ceiling while good
    pub good_ms: f64,
    /// Ceiling while poor
    pub poor_ms: f64,
}

impl Default for JitterCeilings {
    fn default() -> Self {
        Self { excellent_ms: 30.0, good_ms: 50.0, poor_ms: 100.0 }
    }
}

impl JitterCeilings {
    /// Ceiling for `tier`. `None` for [`QualityTier::Critical`].
    pub fn for_tier(&self, tier: QualityTier) -> Option<f64> {
        match tier {
            QualityTier::Excellent => Some(self.excellent_ms),
            QualityTier::Good => Some(self.good_ms),
            QualityTier::Poor => Some(self.poor_ms),
            QualityTier::Critical => None,
        }
    }
}

/// Metrics sampler configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Interval between statistics polls
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_SAMPLE_INTERVAL }
    }
}

/// Quality classifier configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Samples kept in the rolling window
    pub window_size: usize,
    /// Samples required before classifying
    pub min_samples: usize,
    /// Hysteresis thresholds on windowed RTT
    pub thresholds: QualityThresholds,
    /// Jitter tiebreak ceilings
    pub jitter_ceilings: JitterCeilings,
    /// Critical dwell before reconnection is requested
    pub critical_dwell: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            min_samples: DEFAULT_MIN_SAMPLES,
            thresholds: QualityThresholds::default(),
            jitter_ceilings: JitterCeilings::default(),
            critical_dwell: DEFAULT_CRITICAL_DWELL,
        }
    }
}

/// Reconnection controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first automatic retry
    pub base_delay: Duration,
    /// Backoff ceiling (applies after jitter)
    pub max_delay: Duration,
    /// Random spread as a fraction of the nominal delay
    pub jitter_ratio: f64,
    /// Attempts allowed before entering the failed phase
    pub max_attempts: u32,
    /// Time an attempt may take to yield a confirmed healthy transport
    pub attempt_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Complete configuration for one room's connectivity core.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Sampler settings
    pub sampler: SamplerConfig,
    /// Classifier settings
    pub classifier: ClassifierConfig,
    /// Reconnection settings
    pub reconnect: ReconnectConfig,
}

impl ConnectivityConfig {
    /// Check that the configuration describes a usable state machine.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampler.interval.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "sampler.interval" });
        }
        for (field, value) in [
            ("sampler.interval", self.sampler.interval),
            ("classifier.critical_dwell", self.classifier.critical_dwell),
            ("reconnect.max_delay", self.reconnect.max_delay),
            ("reconnect.attempt_timeout", self.reconnect.attempt_timeout),
        ] {
            if value > MAX_CONFIG_DURATION {
                return Err(ConfigError::DurationTooLong { field, value, max: MAX_CONFIG_DURATION });
            }
        }

        let classifier = &self.classifier;
        if classifier.min_samples == 0 || classifier.window_size < classifier.min_samples {
            return Err(ConfigError::WindowTooSmall {
                window_size: classifier.window_size,
                min_samples: classifier.min_samples,
            });
        }
        classifier.thresholds.validate()?;

        let reconnect = &self.reconnect;
        if reconnect.base_delay.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "reconnect.base_delay" });
        }
        if reconnect.attempt_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "reconnect.attempt_timeout" });
        }
        if reconnect.base_delay > reconnect.max_delay {
            return Err(ConfigError::BaseAboveMax {
                base: reconnect.base_delay,
                max: reconnect.max_delay,
            });
        }
        if !(0.0..=1.0).contains(&reconnect.jitter_ratio) {
            return Err(ConfigError::RatioOutOfRange {
                field: "reconnect.jitter_ratio",
                value: reconnect.jitter_ratio,
                max: 1.0,
            });
        }
        if reconnect.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }

        Ok(())
    }
}
