//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use roomlink_core::ReconnectPhase;

use super::{ConnectivitySnapshot, Invariant, InvariantKind, InvariantResult, Violation};

/// An expired session masks reconnection.
///
/// While the session guard has latched expiry, `reconnecting` must be false,
/// whether or not the user acknowledged the banner.
pub struct ExpiredMasksReconnecting;

impl Invariant for ExpiredMasksReconnecting {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ExpiredMasksReconnecting
    }

    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult {
        let state = &snapshot.state;
        if (state.session_expired || snapshot.session_latched) && state.reconnecting {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "reconnecting while session expired (banner {}, latched {})",
                    state.session_expired, snapshot.session_latched
                ),
            });
        }
        Ok(())
    }
}

/// Attempt counter is zero exactly when stable.
pub struct StableMeansNoAttempts;

impl Invariant for StableMeansNoAttempts {
    fn kind(&self) -> InvariantKind {
        InvariantKind::StableMeansNoAttempts
    }

    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult {
        let state = &snapshot.state;
        let stable = state.phase == ReconnectPhase::Stable;
        if stable != (state.reconnect_attempts == 0) {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "phase {:?} with {} attempts",
                    state.phase, state.reconnect_attempts
                ),
            });
        }
        Ok(())
    }
}

/// Attempt counter never exceeds the configured cap.
pub struct AttemptsWithinCap {
    /// Configured maximum attempts.
    pub max_attempts: u32,
}

impl Invariant for AttemptsWithinCap {
    fn kind(&self) -> InvariantKind {
        InvariantKind::AttemptsWithinCap
    }

    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult {
        let attempts = snapshot.state.reconnect_attempts;
        if attempts > self.max_attempts {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("{attempts} attempts, cap is {}", self.max_attempts),
            });
        }
        Ok(())
    }
}

/// Failed is terminal: no reconnecting flag, nothing armed.
pub struct FailedIsQuiet;

impl Invariant for FailedIsQuiet {
    fn kind(&self) -> InvariantKind {
        InvariantKind::FailedIsQuiet
    }

    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult {
        if snapshot.state.phase == ReconnectPhase::Failed
            && (snapshot.state.reconnecting || snapshot.retry_armed)
        {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "failed phase still active (reconnecting {}, armed {})",
                    snapshot.state.reconnecting, snapshot.retry_armed
                ),
            });
        }
        Ok(())
    }
}

/// A latched session expiry pauses the controller and disarms every retry.
pub struct ExpiredSessionDisarms;

impl Invariant for ExpiredSessionDisarms {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ExpiredSessionDisarms
    }

    fn check(&self, snapshot: &ConnectivitySnapshot) -> InvariantResult {
        if snapshot.session_latched && snapshot.retry_armed {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "retry armed with expired session (paused {})",
                    snapshot.controller_paused
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roomlink_app::RoomConnectivityState;

    use super::*;

    fn reconnecting(attempts: u32) -> RoomConnectivityState {
        RoomConnectivityState {
            reconnecting: true,
            reconnect_attempts: attempts,
            phase: ReconnectPhase::Reconnecting,
            ..RoomConnectivityState::default()
        }
    }

    #[test]
    fn expired_banner_with_reconnecting_violates() {
        let state = RoomConnectivityState { session_expired: true, ..reconnecting(2) };
        let snapshot = ConnectivitySnapshot::from_state(state);

        let violation = ExpiredMasksReconnecting.check(&snapshot).unwrap_err();
        assert_eq!(violation.invariant, InvariantKind::ExpiredMasksReconnecting);
    }

    #[test]
    fn acknowledged_expiry_still_masks() {
        let snapshot = ConnectivitySnapshot {
            state: reconnecting(2),
            session_latched: true,
            ..ConnectivitySnapshot::default()
        };

        assert!(ExpiredMasksReconnecting.check(&snapshot).is_err());
    }

    #[test]
    fn stable_with_attempts_violates() {
        let state = RoomConnectivityState { reconnect_attempts: 1, ..Default::default() };
        assert!(StableMeansNoAttempts.check(&ConnectivitySnapshot::from_state(state)).is_err());

        let ok = ConnectivitySnapshot::from_state(reconnecting(1));
        assert!(StableMeansNoAttempts.check(&ok).is_ok());
    }

    #[test]
    fn attempts_over_cap_violate() {
        let check = AttemptsWithinCap { max_attempts: 8 };

        assert!(check.check(&ConnectivitySnapshot::from_state(reconnecting(8))).is_ok());
        assert!(check.check(&ConnectivitySnapshot::from_state(reconnecting(9))).is_err());
    }

    #[test]
    fn failed_with_armed_retry_violates() {
        let snapshot = ConnectivitySnapshot {
            state: RoomConnectivityState {
                phase: ReconnectPhase::Failed,
                reconnect_attempts: 8,
                ..Default::default()
            },
            retry_armed: true,
            ..ConnectivitySnapshot::default()
        };

        assert!(FailedIsQuiet.check(&snapshot).is_err());
        assert!(FailedIsQuiet.check(&ConnectivitySnapshot { retry_armed: false, ..snapshot }).is_ok());
    }

    #[test]
    fn expired_session_with_armed_retry_violates() {
        let snapshot = ConnectivitySnapshot {
            session_latched: true,
            retry_armed: true,
            ..ConnectivitySnapshot::default()
        };

        assert!(ExpiredSessionDisarms.check(&snapshot).is_err());
    }
}
