//! Room connectivity orchestrator.
//!
//! [`RoomConnectivity`] composes the sampler, classifier, reconnection
//! controller and session guard of one room membership into a single state
//! machine with one observable output, [`RoomConnectivityState`].
//!
//! This is a pure state machine: it consumes [`ConnectivityEvent`]s stamped
//! with the current time and produces [`ConnectivityAction`]s for the runtime
//! to execute. The only thing it takes from the [`Environment`] is randomness
//! for backoff jitter.
//!
//! # Precedence
//!
//! The session guard outranks everything else. While the session is invalid
//! the controller is paused and `reconnecting` is reported false, whatever
//! the transport is doing.

use roomlink_core::{
    ConfigError, ConnectivityConfig, Environment, MetricsSampler, QualityClassifier, QualityTier,
    ReconnectAction, ReconnectInput, ReconnectPhase, ReconnectionController, SessionGuard,
    StepContext, TransportStats,
};

use crate::{ConnectivityAction, ConnectivityEvent, RoomConnectivityState};

/// Connectivity state machine for one room membership.
///
/// Created on join, dropped on leave. Single writer: every input goes through
/// [`RoomConnectivity::handle`].
#[derive(Debug, Clone)]
pub struct RoomConnectivity<E: Environment> {
    env: E,
    sampler: MetricsSampler<E::Instant>,
    classifier: QualityClassifier<E::Instant>,
    controller: ReconnectionController<E::Instant>,
    guard: SessionGuard<E::Instant>,
    /// A stats poll was requested and its result has not arrived yet
    poll_outstanding: bool,
    /// User dismissed the banner for the current expiry
    expiry_acknowledged: bool,
    /// Last state handed out through `Publish`
    published: RoomConnectivityState,
    left: bool,
}

impl<E: Environment> RoomConnectivity<E> {
    /// Join: create the per-membership state with a valid session.
    ///
    /// The first stats poll is due immediately.
    pub fn new(env: E, config: ConnectivityConfig, now: E::Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut room = Self {
            env,
            sampler: MetricsSampler::new(now, config.sampler),
            classifier: QualityClassifier::new(config.classifier),
            controller: ReconnectionController::new(config.reconnect),
            guard: SessionGuard::default(),
            poll_outstanding: false,
            expiry_acknowledged: false,
            published: RoomConnectivityState::default(),
            left: false,
        };
        room.published = room.state();
        Ok(room)
    }

    /// Like [`RoomConnectivity::new`], with a known token expiry.
    pub fn with_session_expiry(
        env: E,
        config: ConnectivityConfig,
        now: E::Instant,
        expires_at: E::Instant,
    ) -> Result<Self, ConfigError> {
        let mut room = Self::new(env, config, now)?;
        room.guard = SessionGuard::new(Some(expires_at));
        Ok(room)
    }

    /// Current observable state.
    pub fn state(&self) -> RoomConnectivityState {
        RoomConnectivityState {
            quality: self.classifier.tier(),
            reconnecting: self.controller.state().is_actively_reconnecting()
                && !self.guard.is_expired(),
            reconnect_attempts: self.controller.attempt(),
            session_expired: self.guard.is_expired() && !self.expiry_acknowledged,
            phase: self.controller.phase(),
        }
    }

    /// Whether the membership has ended. No further actions will be emitted.
    pub fn has_left(&self) -> bool {
        self.left
    }

    /// Read access to the reconnection controller.
    pub fn controller(&self) -> &ReconnectionController<E::Instant> {
        &self.controller
    }

    /// Read access to the session guard.
    pub fn session(&self) -> &SessionGuard<E::Instant> {
        &self.guard
    }

    /// Read access to the quality classifier.
    pub fn classifier(&self) -> &QualityClassifier<E::Instant> {
        &self.classifier
    }

    /// Read access to the metrics sampler.
    pub fn sampler(&self) -> &MetricsSampler<E::Instant> {
        &self.sampler
    }

    /// Earliest time at which a [`ConnectivityEvent::Tick`] has work to do.
    ///
    /// Covers the sampler cadence, the retry or attempt deadline and a known
    /// token expiry. `None` once the membership has ended.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        if self.left {
            return None;
        }

        let sampler = (!self.poll_outstanding).then(|| self.sampler.next_due());
        [sampler, self.controller.next_deadline(), self.guard.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// User command: reconnect now, bypassing backoff for the first attempt.
    pub fn force_reconnect(&mut self, now: E::Instant) -> Vec<ConnectivityAction> {
        self.handle(now, ConnectivityEvent::ForceReconnect)
    }

    /// User command: dismiss the session-expired banner.
    ///
    /// Only hides the banner. The session stays invalid and reconnection stays
    /// suppressed until the auth collaborator reports a renewed token.
    pub fn acknowledge_session_expired(&mut self, now: E::Instant) -> Vec<ConnectivityAction> {
        self.handle(now, ConnectivityEvent::AcknowledgeSessionExpired)
    }

    /// End the membership: cancel everything and tear the transport down.
    ///
    /// Terminal. Every later event is ignored.
    pub fn leave(&mut self) -> Vec<ConnectivityAction> {
        if self.left {
            return Vec::new();
        }
        self.left = true;
        tracing::debug!("left room, connectivity tracking stopped");
        vec![ConnectivityAction::Teardown]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, now: E::Instant, event: ConnectivityEvent) -> Vec<ConnectivityAction> {
        if self.left {
            tracing::trace!(?event, "event after leave ignored");
            return Vec::new();
        }

        let mut actions = Vec::new();
        self.latch_elapsed_session(now, &mut actions);

        match event {
            ConnectivityEvent::Tick => self.on_tick(now, &mut actions),
            ConnectivityEvent::StatsPolled(stats) => self.on_stats(now, stats, &mut actions),
            ConnectivityEvent::TransportFailed => {
                self.drive(ReconnectInput::TransportFailed, now, &mut actions);
            },
            ConnectivityEvent::TransportRecovered => {
                let was_confirming = self.controller.is_confirming();
                self.drive(ReconnectInput::TransportRecovered, now, &mut actions);

                // New transport, old samples describe a dead link
                if !was_confirming && self.controller.is_confirming() {
                    self.classifier.reset();
                }
            },
            ConnectivityEvent::TokenExpired => {
                if self.guard.on_token_expired() {
                    self.expiry_acknowledged = false;
                }
                self.drive(ReconnectInput::SessionExpired, now, &mut actions);
            },
            ConnectivityEvent::TokenRenewed { expires_in } => {
                self.guard.on_token_renewed(expires_in.map(|lifetime| now + lifetime));
                self.expiry_acknowledged = false;
                self.drive(ReconnectInput::SessionRenewed, now, &mut actions);
            },
            ConnectivityEvent::ForceReconnect => {
                self.drive(ReconnectInput::ForceReconnect, now, &mut actions);
            },
            ConnectivityEvent::AcknowledgeSessionExpired => {
                if self.guard.is_expired() {
                    self.expiry_acknowledged = true;
                }
            },
            ConnectivityEvent::Leave => return self.leave(),
        }

        self.publish_if_changed(&mut actions);
        actions
    }

    /// Latch a known token expiry that has passed, whatever the event.
    fn latch_elapsed_session(&mut self, now: E::Instant, actions: &mut Vec<ConnectivityAction>) {
        if self.guard.poll(now) {
            self.expiry_acknowledged = false;
            self.drive(ReconnectInput::SessionExpired, now, actions);
        }
    }

    fn on_tick(&mut self, now: E::Instant, actions: &mut Vec<ConnectivityAction>) {
        self.drive(ReconnectInput::Tick, now, actions);

        if !self.poll_outstanding && self.sampler.is_due(now) {
            self.poll_outstanding = true;
            actions.push(ConnectivityAction::PollStats);
        }
    }

    fn on_stats(
        &mut self,
        now: E::Instant,
        stats: Option<TransportStats>,
        actions: &mut Vec<ConnectivityAction>,
    ) {
        self.poll_outstanding = false;

        let Some(sample) = self.sampler.ingest(now, stats) else {
            return;
        };
        let update = self.classifier.push(sample);

        if update.sustained_critical {
            self.drive(ReconnectInput::SustainedCritical, now, actions);
        }
        if self.controller.is_confirming() && update.sample_tier != QualityTier::Critical {
            self.drive(ReconnectInput::HealthySample, now, actions);
        }
    }

    /// Feed one input to the controller and translate its actions.
    fn drive(
        &mut self,
        input: ReconnectInput,
        now: E::Instant,
        actions: &mut Vec<ConnectivityAction>,
    ) {
        let ctx = StepContext {
            now,
            session_valid: self.guard.is_valid(now),
            jitter_roll: self.env.random_u64(),
        };

        actions.extend(self.controller.handle(input, ctx).into_iter().map(|action| match action {
            ReconnectAction::Teardown => ConnectivityAction::Teardown,
            ReconnectAction::Reestablish { attempt } => ConnectivityAction::Reestablish { attempt },
        }));
    }

    fn publish_if_changed(&mut self, actions: &mut Vec<ConnectivityAction>) {
        let current = self.state();
        if current == self.published {
            return;
        }

        if current.phase != self.published.phase && current.phase == ReconnectPhase::Stable {
            tracing::info!(quality = %current.quality, "connection recovered");
        }
        self.published = current;
        actions.push(ConnectivityAction::Publish(current));
    }
}
