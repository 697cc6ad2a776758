//! Observable connectivity state.
//!
//! [`RoomConnectivityState`] is the view model handed to the presentation
//! layer. It is a derived snapshot: recomputed after every input, never
//! written by the UI.

use roomlink_core::{QualityTier, ReconnectPhase};
use serde::{Deserialize, Serialize};

/// Externally observable connectivity of one room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConnectivityState {
    /// Current quality tier.
    pub quality: QualityTier,
    /// A reconnection is actively being pursued. Always false while the
    /// session is expired.
    pub reconnecting: bool,
    /// Attempt number of the current reconnection cycle. 0 when stable.
    pub reconnect_attempts: u32,
    /// Session expiry banner should be shown.
    pub session_expired: bool,
    /// Reconnection phase, so the UI can offer a retry once attempts are
    /// exhausted.
    pub phase: ReconnectPhase,
}

impl Default for RoomConnectivityState {
    fn default() -> Self {
        Self {
            quality: QualityTier::Good,
            reconnecting: false,
            reconnect_attempts: 0,
            session_expired: false,
            phase: ReconnectPhase::Stable,
        }
    }
}

impl RoomConnectivityState {
    /// Attempts are exhausted and only a forced reconnect can help.
    pub fn is_failed(&self) -> bool {
        self.phase == ReconnectPhase::Failed
    }
}
