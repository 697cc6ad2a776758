//! Connectivity input events.
//!
//! This module defines [`ConnectivityEvent`], the full set of inputs that
//! drive the [`crate::RoomConnectivity`] state machine.
//!
//! Events originate from three sources:
//! - Timer expiry and transport statistics polls requested by the machine.
//! - Collaborator notifications (peer connection, auth token lifecycle).
//! - The two user commands.

use std::time::Duration;

use roomlink_core::TransportStats;

use crate::DriverEvent;

/// Events processed by the room connectivity state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectivityEvent {
    /// Time advanced to (or past) the next deadline.
    Tick,

    /// Result of a [`crate::ConnectivityAction::PollStats`] request.
    /// `None` if the transport had nothing to report.
    StatsPolled(Option<TransportStats>),

    /// The peer connection failed or was closed by the remote.
    TransportFailed,

    /// A re-established peer connection is up.
    TransportRecovered,

    /// The auth collaborator reported the session token expired.
    TokenExpired,

    /// The user re-authenticated and a new token was issued.
    TokenRenewed {
        /// Lifetime of the new token, if known.
        expires_in: Option<Duration>,
    },

    /// User asked to reconnect now.
    ForceReconnect,

    /// User dismissed the session-expired banner.
    AcknowledgeSessionExpired,

    /// Room membership ended.
    Leave,
}

impl From<DriverEvent> for ConnectivityEvent {
    fn from(event: DriverEvent) -> Self {
        match event {
            DriverEvent::TransportFailed => Self::TransportFailed,
            DriverEvent::TransportRecovered => Self::TransportRecovered,
            DriverEvent::TokenExpired => Self::TokenExpired,
            DriverEvent::TokenRenewed { expires_in } => Self::TokenRenewed { expires_in },
            DriverEvent::ForceReconnect => Self::ForceReconnect,
            DriverEvent::AcknowledgeSessionExpired => Self::AcknowledgeSessionExpired,
            DriverEvent::Leave => Self::Leave,
        }
    }
}
