//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during execution. Unlike
//! example-based tests that check specific scenarios, invariants verify
//! behavioral properties across all execution paths.
//!
//! # Architecture
//!
//! The invariant system extracts observable state from a
//! [`roomlink_app::RoomConnectivity`] (or a published
//! [`roomlink_app::RoomConnectivityState`]) into a [`ConnectivitySnapshot`],
//! then runs registered [`Invariant`] checks against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard(config.reconnect.max_attempts);
//! let snapshot = ConnectivitySnapshot::from_room(&room);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    AttemptsWithinCap, ExpiredMasksReconnecting, ExpiredSessionDisarms, FailedIsQuiet,
    StableMeansNoAttempts,
};
pub use snapshot::ConnectivitySnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Identifies which invariant was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// `reconnecting` shown while the session is expired
    ExpiredMasksReconnecting,
    /// Attempt counter disagrees with the phase
    StableMeansNoAttempts,
    /// Attempt counter past the cap
    AttemptsWithinCap,
    /// Failed phase still retrying
    FailedIsQuiet,
    /// Retry armed with an expired session
    ExpiredSessionDisarms,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which invariant was violated.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against a connectivity snapshot.
///
/// Invariants are behavioral properties that must always hold.
/// They capture WHAT must be true, not specific test scenarios.
pub trait Invariant: Send + Sync {
    /// Which invariant this is, for error reporting.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against the snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Collects multiple invariants and runs them all against a snapshot.
/// Use [`InvariantRegistry::standard()`] for the connectivity invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.invariants.iter().map(|inv| inv.kind())).finish()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard connectivity invariants.
    ///
    /// Includes:
    /// - [`ExpiredMasksReconnecting`]: expiry always masks `reconnecting`
    /// - [`StableMeansNoAttempts`]: attempts are 0 exactly when stable
    /// - [`AttemptsWithinCap`]: attempts never exceed `max_attempts`
    /// - [`FailedIsQuiet`]: nothing armed once failed
    /// - [`ExpiredSessionDisarms`]: nothing armed while expired
    pub fn standard(max_attempts: u32) -> Self {
        let mut registry = Self::new();
        registry.add(ExpiredMasksReconnecting);
        registry.add(StableMeansNoAttempts);
        registry.add(AttemptsWithinCap { max_attempts });
        registry.add(FailedIsQuiet);
        registry.add(ExpiredSessionDisarms);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given snapshot.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, snapshot: &ConnectivitySnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(snapshot).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on the first violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, snapshot: &ConnectivitySnapshot, context: &str) {
        if let Err(violations) = self.check_all(snapshot) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
