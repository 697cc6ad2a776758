//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the connectivity runtime from the concrete
//! peer-connection, auth and UI collaborators. Each frontend implements the
//! trait, while the generic [`crate::Runtime`] handles all orchestration.

use std::{future::Future, time::Duration};

use roomlink_core::TransportStats;

use crate::RoomConnectivityState;

/// Notifications delivered by the collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// The peer connection failed.
    TransportFailed,
    /// A re-established peer connection is up.
    TransportRecovered,
    /// The session token expired.
    TokenExpired,
    /// The user re-authenticated.
    TokenRenewed {
        /// Lifetime of the new token, if known.
        expires_in: Option<Duration>,
    },
    /// User pressed "reconnect".
    ForceReconnect,
    /// User dismissed the session-expired banner.
    AcknowledgeSessionExpired,
    /// User left the room.
    Leave,
}

/// Abstracts I/O operations for the connectivity runtime.
///
/// Implementations provide the platform's peer connection and UI while the
/// generic [`Runtime`](crate::Runtime) handles orchestration logic. The same
/// orchestration code runs in production and in simulation.
///
/// # Implementations
///
/// - **Simulation**: `roomlink_harness::SimDriver`, scripted transport and
///   auth behaviour under virtual time
/// - **Browser/native clients**: wrap the peer-connection object, the auth
///   token store and the view layer
///
/// The core never asks a driver to re-authenticate; renewal is the user's job
/// and arrives as [`DriverEvent::TokenRenewed`].
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next collaborator notification.
    ///
    /// Returns `None` once the event source is closed, which the runtime
    /// treats as leaving the room.
    ///
    /// Must be cancel-safe: the runtime races it against its timer and drops
    /// the future when the timer wins.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Read the current transport statistics.
    ///
    /// Returns `None` if the transport has nothing to report (e.g. no live
    /// connection).
    fn poll_stats(
        &mut self,
    ) -> impl Future<Output = Result<Option<TransportStats>, Self::Error>> + Send;

    /// Tear down the current peer connection.
    fn teardown(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Start building a new peer connection.
    ///
    /// Completion is reported later through
    /// [`DriverEvent::TransportRecovered`] or [`DriverEvent::TransportFailed`].
    /// An error here counts as a failed attempt.
    fn reestablish(&mut self, attempt: u32) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Hand a new observable state to the presentation layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer is gone.
    fn publish(&mut self, state: &RoomConnectivityState) -> Result<(), Self::Error>;
}
