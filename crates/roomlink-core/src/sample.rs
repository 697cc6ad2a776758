//! Metrics sampler.
//!
//! Turns raw transport statistics into [`MetricsSample`]s on a fixed cadence.
//! The sampler never invents data: a tick where the transport had nothing to
//! report produces no sample, so a torn-down connection can never read as a
//! perfect one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::SamplerConfig, env::MonotonicInstant, error::SampleError};

/// Raw reading from the transport statistics API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportStats {
    /// Round-trip time in milliseconds
    pub rtt_ms: f64,
    /// Jitter in milliseconds
    pub jitter_ms: f64,
}

impl TransportStats {
    /// Reading with the given RTT and jitter.
    pub const fn new(rtt_ms: f64, jitter_ms: f64) -> Self {
        Self { rtt_ms, jitter_ms }
    }
}

/// Validated metrics sample, stamped with its capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSample<I> {
    /// Round-trip time in milliseconds (>= 0)
    pub rtt_ms: f64,
    /// Jitter in milliseconds (>= 0)
    pub jitter_ms: f64,
    /// When the reading was taken
    pub captured_at: I,
}

impl<I: MonotonicInstant> MetricsSample<I> {
    /// Validate a transport reading and stamp it.
    ///
    /// # Errors
    ///
    /// - `SampleError::NonFinite` if either metric is NaN or infinite
    /// - `SampleError::Negative` if either metric is below zero
    pub fn new(stats: TransportStats, captured_at: I) -> Result<Self, SampleError> {
        for (metric, value) in [("rtt_ms", stats.rtt_ms), ("jitter_ms", stats.jitter_ms)] {
            if !value.is_finite() {
                return Err(SampleError::NonFinite { metric, value });
            }
            if value < 0.0 {
                return Err(SampleError::Negative { metric, value });
            }
        }

        Ok(Self { rtt_ms: stats.rtt_ms, jitter_ms: stats.jitter_ms, captured_at })
    }
}

/// Fixed-cadence sampler state.
///
/// Pure: the caller asks [`MetricsSampler::is_due`], polls the transport when
/// it is, and hands the result to [`MetricsSampler::ingest`].
#[derive(Debug, Clone)]
pub struct MetricsSampler<I> {
    interval: Duration,
    next_due: I,
    missed_ticks: u64,
    samples_taken: u64,
}

impl<I: MonotonicInstant> MetricsSampler<I> {
    /// Sampler whose first tick is due immediately.
    pub fn new(now: I, config: SamplerConfig) -> Self {
        Self { interval: config.interval, next_due: now, missed_ticks: 0, samples_taken: 0 }
    }

    /// When the next poll is due.
    pub fn next_due(&self) -> I {
        self.next_due
    }

    /// Whether a poll is due at `now`.
    pub fn is_due(&self, now: I) -> bool {
        now >= self.next_due
    }

    /// Ticks that produced no sample (unavailable or rejected readings).
    pub fn missed_ticks(&self) -> u64 {
        self.missed_ticks
    }

    /// Ticks that produced a sample.
    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    /// Record one poll result and schedule the next tick.
    ///
    /// `None` means the transport had no data (e.g. the connection object is
    /// gone); it yields no sample. Invalid readings are logged and dropped.
    /// Neither counts as a failure signal.
    pub fn ingest(&mut self, now: I, stats: Option<TransportStats>) -> Option<MetricsSample<I>> {
        self.next_due = now + self.interval;

        let Some(stats) = stats else {
            self.missed_ticks += 1;
            tracing::debug!(missed = self.missed_ticks, "transport stats unavailable, no sample");
            return None;
        };

        match MetricsSample::new(stats, now) {
            Ok(sample) => {
                self.samples_taken += 1;
                Some(sample)
            },
            Err(err) => {
                self.missed_ticks += 1;
                tracing::warn!(error = %err, "dropping invalid transport stats");
                None
            },
        }
    }
}
