//! Quality classifier.
//!
//! Maps a rolling window of [`MetricsSample`]s to a [`QualityTier`]. Windowed
//! average RTT is the primary signal; windowed jitter only breaks ties when
//! the RTT sits inside the current tier's hysteresis band.
//!
//! # Hysteresis
//!
//! ```text
//!            enter ≤ 80      enter ≤ 180      enter ≤ 350
//!   Excellent <────── Good <────────── Poor <────────── Critical
//!             ──────>      ──────────>      ──────────>
//!            exit > 100     exit > 220       exit > 420
//! ```
//!
//! Improving needs the average to reach the better tier's enter threshold;
//! worsening needs it to pass the current tier's exit threshold. Readings
//! between the two leave the tier unchanged.

use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::{config::ClassifierConfig, env::MonotonicInstant, sample::MetricsSample};

/// Connection quality, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Low latency, stable
    Excellent,
    /// Usable
    Good,
    /// Noticeably degraded
    Poor,
    /// Unusable; candidate for reconnection
    Critical,
}

impl QualityTier {
    /// Tiers that have thresholds, best first.
    pub const BOUNDED: [Self; 3] = [Self::Excellent, Self::Good, Self::Poor];

    /// Next worse tier. Critical stays critical.
    pub fn worse(self) -> Self {
        match self {
            Self::Excellent => Self::Good,
            Self::Good => Self::Poor,
            Self::Poor | Self::Critical => Self::Critical,
        }
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of pushing one sample into the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierUpdate {
    /// Tier before this sample
    pub previous: QualityTier,
    /// Tier after this sample
    pub tier: QualityTier,
    /// This sample on its own, without window or hysteresis
    pub sample_tier: QualityTier,
    /// Critical dwell was reached with this sample. Reported once per
    /// critical episode.
    pub sustained_critical: bool,
}

impl ClassifierUpdate {
    /// Whether the reported tier changed.
    pub fn changed(&self) -> bool {
        self.previous != self.tier
    }
}

/// Rolling-window classifier with two-sided hysteresis and critical dwell
/// tracking.
#[derive(Debug, Clone)]
pub struct QualityClassifier<I> {
    config: ClassifierConfig,
    window: VecDeque<MetricsSample<I>>,
    tier: QualityTier,
    /// Capture time of the first sample of the current critical episode
    critical_since: Option<I>,
    /// Sustained-critical already signalled for the current episode
    dwell_reported: bool,
}

impl<I: MonotonicInstant> QualityClassifier<I> {
    /// Empty classifier reporting [`QualityTier::Good`].
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size),
            config,
            tier: QualityTier::Good,
            critical_since: None,
            dwell_reported: false,
        }
    }

    /// Current tier.
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Samples currently in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Windowed average RTT. `None` if the window is empty.
    pub fn average_rtt_ms(&self) -> Option<f64> {
        self.average(|s| s.rtt_ms)
    }

    /// Windowed average jitter. `None` if the window is empty.
    pub fn average_jitter_ms(&self) -> Option<f64> {
        self.average(|s| s.jitter_ms)
    }

    /// Start time of the ongoing critical episode, if any.
    pub fn critical_since(&self) -> Option<I> {
        self.critical_since
    }

    /// Forget all history. Used after the transport is replaced.
    pub fn reset(&mut self) {
        self.window.clear();
        self.tier = QualityTier::Good;
        self.critical_since = None;
        self.dwell_reported = false;
    }

    /// Classify a single sample with no window and no hysteresis.
    ///
    /// Uses the lenient (exit) bounds: a sample is critical only if its RTT
    /// is past the poor tier's exit threshold.
    pub fn instant_tier(&self, sample: &MetricsSample<I>) -> QualityTier {
        let thresholds = &self.config.thresholds;
        QualityTier::BOUNDED
            .into_iter()
            .find(|tier| thresholds.for_tier(*tier).is_some_and(|t| sample.rtt_ms <= t.exit_ms))
            .unwrap_or(QualityTier::Critical)
    }

    /// Add a sample and reclassify.
    pub fn push(&mut self, sample: MetricsSample<I>) -> ClassifierUpdate {
        if self.window.len() >= self.config.window_size {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        let previous = self.tier;
        self.tier = match (self.average_rtt_ms(), self.average_jitter_ms()) {
            (Some(rtt), Some(jitter)) if self.window.len() >= self.config.min_samples => {
                self.next_tier(previous, rtt, jitter)
            },
            _ => QualityTier::Good,
        };

        if self.tier != previous {
            tracing::debug!(
                from = %previous,
                to = %self.tier,
                avg_rtt_ms = self.average_rtt_ms(),
                avg_jitter_ms = self.average_jitter_ms(),
                "quality tier changed"
            );
        }

        let sustained_critical = self.track_dwell(sample.captured_at);

        ClassifierUpdate {
            previous,
            tier: self.tier,
            sample_tier: self.instant_tier(&sample),
            sustained_critical,
        }
    }

    fn next_tier(&self, current: QualityTier, rtt: f64, jitter: f64) -> QualityTier {
        let thresholds = &self.config.thresholds;

        let entered = QualityTier::BOUNDED
            .into_iter()
            .find(|tier| thresholds.for_tier(*tier).is_some_and(|t| rtt <= t.enter_ms))
            .unwrap_or(QualityTier::Critical);
        if entered < current {
            return entered;
        }

        let Some(threshold) = thresholds.for_tier(current) else {
            return current;
        };

        if rtt > threshold.exit_ms {
            return QualityTier::BOUNDED
                .into_iter()
                .filter(|tier| *tier > current)
                .find(|tier| thresholds.for_tier(*tier).is_some_and(|t| rtt <= t.exit_ms))
                .unwrap_or(QualityTier::Critical);
        }

        // Inside the band: RTT alone can't decide, jitter may only worsen.
        if rtt > threshold.enter_ms
            && self.config.jitter_ceilings.for_tier(current).is_some_and(|ceiling| jitter > ceiling)
        {
            return current.worse();
        }

        current
    }

    fn track_dwell(&mut self, now: I) -> bool {
        if self.tier != QualityTier::Critical {
            self.critical_since = None;
            self.dwell_reported = false;
            return false;
        }

        let since = *self.critical_since.get_or_insert(now);
        if !self.dwell_reported && now.saturating_since(since) >= self.config.critical_dwell {
            self.dwell_reported = true;
            tracing::debug!(dwell = ?now.saturating_since(since), "critical quality sustained");
            return true;
        }

        false
    }

    fn average(&self, metric: impl Fn(&MetricsSample<I>) -> f64) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().map(metric).sum::<f64>() / self.window.len() as f64)
    }
}
