//! Simulated world for model-based testing.
//!
//! [`ModelWorld`] drives a real [`RoomConnectivity`] synchronously: it owns a
//! manual clock, plays the peer connection (link up or down, a settable RTT),
//! and executes every action the state machine emits. After each
//! [`Operation`] it checks the invariant registry, the session reference
//! model and publish completeness.

use std::{collections::VecDeque, time::Duration};

use roomlink_app::{ConnectivityAction, ConnectivityEvent, RoomConnectivity, RoomConnectivityState};
use roomlink_core::{ConfigError, ConnectivityConfig, Environment, TransportStats};
use tokio::time::Instant;

use super::{Operation, SessionModel};
use crate::{
    SimEnv,
    invariants::{ConnectivitySnapshot, InvariantKind, InvariantRegistry, Violation},
};

/// Upper bound on deadlines fired by one `AdvanceTime`.
const MAX_TICKS_PER_ADVANCE: usize = 1024;

/// Ways the real system can disagree with expectations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorldError {
    /// One or more invariants broke.
    #[error("invariants violated after {operation:?}: {violations:?}")]
    Invariant {
        /// Operation that was just applied.
        operation: Operation,
        /// What broke.
        violations: Vec<Violation>,
    },

    /// Session banner disagrees with the reference model.
    #[error("session banner after {operation:?}: expected {expected}, got {actual}")]
    SessionMismatch {
        /// Operation that was just applied.
        operation: Operation,
        /// Reference model's answer.
        expected: bool,
        /// Real system's answer.
        actual: bool,
    },

    /// State changed without a matching `Publish`.
    #[error("unpublished state change after {operation:?}: published {published:?}, actual {actual:?}")]
    StalePublish {
        /// Operation that was just applied.
        operation: Operation,
        /// Last published state.
        published: RoomConnectivityState,
        /// Current state.
        actual: RoomConnectivityState,
    },

    /// Deadlines kept firing without time moving forward.
    #[error("deadline loop did not settle within {MAX_TICKS_PER_ADVANCE} ticks")]
    Livelock,
}

/// Deterministic single-room world with a manual clock.
#[derive(Debug)]
pub struct ModelWorld {
    room: RoomConnectivity<SimEnv>,
    base: Instant,
    elapsed: Duration,
    link_up: bool,
    link: TransportStats,
    session: SessionModel,
    published: RoomConnectivityState,
    invariants: InvariantRegistry,
    reestablished: Vec<u32>,
}

impl ModelWorld {
    /// World with the default configuration.
    pub fn new(seed: u64) -> Result<Self, ConfigError> {
        Self::with_config(seed, ConnectivityConfig::default())
    }

    /// World with a custom configuration.
    pub fn with_config(seed: u64, config: ConnectivityConfig) -> Result<Self, ConfigError> {
        let env = SimEnv::with_seed(seed);
        let base = env.now();
        let invariants = InvariantRegistry::standard(config.reconnect.max_attempts);
        let room = RoomConnectivity::new(env, config, base)?;

        Ok(Self {
            published: room.state(),
            room,
            base,
            elapsed: Duration::ZERO,
            link_up: true,
            link: TransportStats::new(40.0, 4.0),
            session: SessionModel::default(),
            invariants,
            reestablished: Vec::new(),
        })
    }

    /// Current simulated time.
    pub fn now(&self) -> Instant {
        self.base + self.elapsed
    }

    /// Time since the world was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Current observable state.
    pub fn state(&self) -> RoomConnectivityState {
        self.room.state()
    }

    /// The system under test.
    pub fn room(&self) -> &RoomConnectivity<SimEnv> {
        &self.room
    }

    /// Attempt numbers of every re-establish executed so far.
    pub fn reestablished(&self) -> &[u32] {
        &self.reestablished
    }

    /// Apply one operation and check every expectation.
    pub fn apply(&mut self, operation: Operation) -> Result<(), WorldError> {
        if self.room.has_left() {
            return Ok(());
        }

        match operation {
            Operation::AdvanceTime { millis } => {
                self.advance(Duration::from_millis(u64::from(millis)))?;
            },
            Operation::SetLink { rtt_ms, jitter_ms } => {
                self.link = TransportStats::new(f64::from(rtt_ms), f64::from(jitter_ms));
            },
            Operation::TransportFailed => {
                self.link_up = false;
                self.feed(ConnectivityEvent::TransportFailed);
            },
            Operation::TransportRecovered => {
                self.link_up = true;
                self.feed(ConnectivityEvent::TransportRecovered);
            },
            Operation::TokenExpired => {
                self.session.expire();
                self.feed(ConnectivityEvent::TokenExpired);
            },
            Operation::TokenRenewed { lifetime_secs } => {
                let expires_in = lifetime_secs.map(|secs| Duration::from_secs(u64::from(secs)));
                self.session.renew(self.elapsed, expires_in);
                self.feed(ConnectivityEvent::TokenRenewed { expires_in });
            },
            Operation::ForceReconnect => self.feed(ConnectivityEvent::ForceReconnect),
            Operation::AcknowledgeSessionExpired => {
                self.session.acknowledge();
                self.feed(ConnectivityEvent::AcknowledgeSessionExpired);
            },
            Operation::Leave => self.feed(ConnectivityEvent::Leave),
        }

        self.verify(operation)
    }

    /// Step through every deadline up to `now + by`, then settle at the target.
    fn advance(&mut self, by: Duration) -> Result<(), WorldError> {
        let target = self.elapsed + by;

        for _ in 0..MAX_TICKS_PER_ADVANCE {
            let due = self
                .room
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(self.base))
                .filter(|offset| *offset <= target);

            let Some(offset) = due else {
                self.elapsed = target;
                self.session.advance(target);
                return Ok(());
            };

            self.elapsed = self.elapsed.max(offset);
            self.session.advance(self.elapsed);
            self.feed(ConnectivityEvent::Tick);
        }

        Err(WorldError::Livelock)
    }

    /// Hand an event to the room and execute the resulting actions.
    fn feed(&mut self, event: ConnectivityEvent) {
        let now = self.now();
        let mut pending: VecDeque<_> = self.room.handle(now, event).into();

        while let Some(action) = pending.pop_front() {
            match action {
                ConnectivityAction::PollStats => {
                    let stats = self.link_up.then_some(self.link);
                    pending.extend(self.room.handle(now, ConnectivityEvent::StatsPolled(stats)));
                },
                ConnectivityAction::Teardown => self.link_up = false,
                ConnectivityAction::Reestablish { attempt } => self.reestablished.push(attempt),
                ConnectivityAction::Publish(state) => self.published = state,
            }
        }
    }

    fn verify(&self, operation: Operation) -> Result<(), WorldError> {
        self.invariants
            .check_all(&ConnectivitySnapshot::from_room(&self.room))
            .map_err(|violations| WorldError::Invariant { operation, violations })?;

        let actual = self.room.state();
        if actual.session_expired != self.session.banner() {
            return Err(WorldError::SessionMismatch {
                operation,
                expected: self.session.banner(),
                actual: actual.session_expired,
            });
        }

        if actual.reconnecting && self.session.is_latched() {
            return Err(WorldError::Invariant {
                operation,
                violations: vec![Violation {
                    invariant: InvariantKind::ExpiredMasksReconnecting,
                    message: "reference model has the session expired".to_owned(),
                }],
            });
        }

        if actual != self.published {
            return Err(WorldError::StalePublish { operation, published: self.published, actual });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roomlink_core::{QualityTier, ReconnectPhase};

    use super::*;

    fn advance_secs(world: &mut ModelWorld, secs: u16) {
        world.apply(Operation::AdvanceTime { millis: secs * 1000 }).unwrap();
    }

    #[test]
    fn healthy_link_reaches_excellent() {
        let mut world = ModelWorld::new(1).unwrap();

        advance_secs(&mut world, 10);

        assert_eq!(world.state().quality, QualityTier::Excellent);
        assert_eq!(world.state().phase, ReconnectPhase::Stable);
    }

    #[test]
    fn congested_link_triggers_reconnection() {
        let mut world = ModelWorld::new(1).unwrap();
        world.apply(Operation::SetLink { rtt_ms: 600, jitter_ms: 10 }).unwrap();

        // Samples at 0,2,4,6,8 s: critical from 2 s, dwell met at 8 s
        advance_secs(&mut world, 8);

        let state = world.state();
        assert!(state.reconnecting);
        assert_eq!(state.reconnect_attempts, 1);
    }

    #[test]
    fn unanswered_attempts_exhaust_into_failed() {
        let mut world = ModelWorld::new(3).unwrap();
        world.apply(Operation::TransportFailed).unwrap();

        // Backoff plus 10 s timeout per attempt stays well under 10 minutes
        for _ in 0..10 {
            advance_secs(&mut world, 60);
        }

        let state = world.state();
        assert_eq!(state.phase, ReconnectPhase::Failed);
        assert_eq!(state.reconnect_attempts, 8);
        assert_eq!(world.reestablished(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn leave_freezes_world() {
        let mut world = ModelWorld::new(1).unwrap();
        world.apply(Operation::Leave).unwrap();
        world.apply(Operation::TransportFailed).unwrap();

        assert!(world.room().has_left());
        assert!(!world.state().reconnecting);
    }
}
