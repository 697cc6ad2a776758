//! Connectivity side-effects.
//!
//! This module defines the [`ConnectivityAction`] enum, the instructions
//! produced by the [`crate::RoomConnectivity`] state machine for the runtime
//! to execute, in order.

use crate::RoomConnectivityState;

/// Actions produced by the room connectivity state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityAction {
    /// Read transport statistics and feed the result back as
    /// [`crate::ConnectivityEvent::StatsPolled`].
    PollStats,

    /// Tear down the current peer connection.
    Teardown,

    /// Build a new peer connection.
    Reestablish {
        /// 1-based attempt number.
        attempt: u32,
    },

    /// Observable state changed; hand it to the presentation layer.
    Publish(RoomConnectivityState),
}
