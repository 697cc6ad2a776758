//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to one room membership.
//! They are generated randomly by proptest or the fuzzer and applied to the
//! [`crate::ModelWorld`].

use arbitrary::Arbitrary;

/// Operations that can be applied to the system.
///
/// Field types are kept small so generated sequences stay in realistic
/// ranges (RTTs under 65 s, token lifetimes under a day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Advance simulation time, firing every deadline on the way.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Change what the transport reports from now on.
    SetLink {
        /// Round-trip time in milliseconds.
        rtt_ms: u16,
        /// Jitter in milliseconds.
        jitter_ms: u8,
    },

    /// Peer connection failed.
    TransportFailed,

    /// Peer connection came back.
    TransportRecovered,

    /// Auth collaborator reports the token expired.
    TokenExpired,

    /// User re-authenticated.
    TokenRenewed {
        /// Lifetime of the new token in seconds, if known.
        lifetime_secs: Option<u16>,
    },

    /// User pressed "reconnect".
    ForceReconnect,

    /// User dismissed the session-expired banner.
    AcknowledgeSessionExpired,

    /// User left the room.
    Leave,
}
