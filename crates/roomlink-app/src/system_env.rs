//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` is the production implementation of the Environment trait.
//!
//! # Capabilities
//!
//! - Real monotonic time (`std::time::Instant`) that advances naturally
//! - OS RNG (getrandom) for backoff jitter. Not reproducible
//! - Tokio async sleep for actual wall-clock delays

use std::time::Duration;

use roomlink_core::Environment;

/// Production environment using system time and OS randomness.
///
/// If the OS RNG fails the buffer is zero-filled (the lowest jitter roll) and
/// a warning is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(error) = getrandom::fill(buffer) {
            tracing::warn!(%error, "OS RNG unavailable, using zero jitter roll");
            buffer.fill(0);
        }
    }
}
