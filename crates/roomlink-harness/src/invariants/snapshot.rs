//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the connectivity state at a point in time. Invariants
//! operate on snapshots rather than live state so every check sees one
//! consistent view.

use roomlink_app::{RoomConnectivity, RoomConnectivityState};
use roomlink_core::Environment;

/// Snapshot of one room membership's connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectivitySnapshot {
    /// Published observable state.
    pub state: RoomConnectivityState,
    /// Session guard has latched expiry (independent of the UI banner).
    pub session_latched: bool,
    /// Reconnection controller is paused by an invalid session.
    pub controller_paused: bool,
    /// A retry is scheduled or an attempt is in flight.
    pub retry_armed: bool,
}

impl ConnectivitySnapshot {
    /// Snapshot of the full orchestrator state.
    pub fn from_room<E: Environment>(room: &RoomConnectivity<E>) -> Self {
        Self {
            state: room.state(),
            session_latched: room.session().is_expired(),
            controller_paused: room.controller().is_paused(),
            retry_armed: room.controller().next_deadline().is_some(),
        }
    }

    /// Snapshot from a published state only.
    ///
    /// Internal flags are inferred conservatively: a shown banner implies a
    /// latched session, nothing else is assumed.
    pub fn from_state(state: RoomConnectivityState) -> Self {
        Self {
            state,
            session_latched: state.session_expired,
            controller_paused: false,
            retry_armed: false,
        }
    }
}
