//! Environment abstraction for deterministic testing.
//!
//! Decouples connectivity logic from system resources (time, randomness).
//! Enables deterministic simulation (virtual clock, seeded RNG) and production
//! use with real system resources.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// Monotonic instant usable by the connectivity state machines.
///
/// Blanket-implemented for any type with the required arithmetic, so both
/// `std::time::Instant` and `tokio::time::Instant` qualify.
pub trait MonotonicInstant:
    Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = Self>
{
    /// Duration from `earlier` to `self`, zero if `earlier` is later.
    fn saturating_since(self, earlier: Self) -> Duration {
        if self > earlier { self - earlier } else { Duration::ZERO }
    }
}

impl<T> MonotonicInstant for T where
    T: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time (e.g., `tokio::time::Instant` with the
    /// clock paused).
    type Instant: MonotonicInstant;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context. Subsequent calls must return times >= previous
    ///   calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by runtime code (not connectivity logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used as the jitter roll for reconnection backoff.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
