//! Reconnection controller.
//!
//! Decides when to tear down and re-establish the peer connection. The core is
//! a pure transition function, [`transition`], over a small tagged state
//! ([`ReconnectionState`]). Time, session validity and the jitter roll are
//! passed in, so the whole machine can be exercised without timers or real
//! transports. [`ReconnectionController`] owns a state value and logs phase
//! changes.
//!
//! # State Machine
//!
//! ```text
//!            critical dwell / transport failed / force
//! ┌────────┐ ───────────────────────────────────────> ┌──────────────┐
//! │ Stable │                                          │ Reconnecting │──┐ retry failed,
//! └────────┘ <─────────────────────────────────────── └──────────────┘<─┘ attempt < cap
//!      ↑       recovered + non-critical sample               │
//!      │                                                     │ retry failed, attempt == cap
//!      │                 force                               ↓
//!      └─── (via Reconnecting) <─────────────────────── ┌────────┐
//!                                                       │ Failed │
//!                                                       └────────┘
//! ```
//!
//! Inside Reconnecting, the current attempt moves through [`RetryStage`]:
//! `Scheduled` (waiting out the backoff) → `InFlight` (re-establish issued) →
//! `Confirming` (transport is back, waiting for a non-critical sample).
//!
//! An invalid session pauses the controller from any state: nothing is armed
//! and the attempt count is frozen until the session is renewed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::ReconnectConfig, env::MonotonicInstant};

/// Externally reported reconnection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectPhase {
    /// Connection considered healthy
    Stable,
    /// Working through retry attempts
    Reconnecting,
    /// Retry budget exhausted; waits for a forced reconnect
    Failed,
}

/// Progress of the current attempt while reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStage<I> {
    /// Nothing armed (stable, failed, or paused)
    Idle,
    /// Backoff running; re-establish is issued at `at`
    Scheduled {
        /// When the retry fires
        at: I,
    },
    /// Re-establish issued, waiting for the transport
    InFlight {
        /// Attempt is failed if unresolved by then
        deadline: I,
    },
    /// Transport reported recovered, waiting for a non-critical sample
    Confirming {
        /// Attempt is failed if unconfirmed by then
        deadline: I,
    },
}

/// Inputs to the reconnection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectInput {
    /// Classifier reported critical quality for the full dwell time
    SustainedCritical,
    /// Peer-connection collaborator reported the transport failed
    TransportFailed,
    /// Peer-connection collaborator reported a new transport is up
    TransportRecovered,
    /// A non-critical sample arrived from the current transport
    HealthySample,
    /// User asked to reconnect now
    ForceReconnect,
    /// Time advanced; fire due retries and expire stale attempts
    Tick,
    /// Session guard reported the session invalid
    SessionExpired,
    /// Session guard reported the session valid again
    SessionRenewed,
}

/// Per-step context injected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepContext<I> {
    /// Current time
    pub now: I,
    /// Whether the session guard currently considers the session usable
    pub session_valid: bool,
    /// Uniform random value used for backoff jitter
    pub jitter_roll: u64,
}

/// Commands for the peer-connection collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconnectAction {
    /// Tear down the current transport
    Teardown,
    /// Build a new transport
    Reestablish {
        /// 1-based attempt number
        attempt: u32,
    },
}

/// Reconnection state. Owned by the controller, changed only via
/// [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectionState<I> {
    /// Observable phase
    pub phase: ReconnectPhase,
    /// Attempt number in the current cycle. 0 when stable.
    pub attempt: u32,
    /// Progress of the current attempt
    pub stage: RetryStage<I>,
    /// Last armed backoff delay, floor for the next one
    pub last_delay: Option<Duration>,
    /// Suppressed by an invalid session
    pub paused: bool,
    /// A cycle trigger arrived while suspended in Stable; the cycle starts on
    /// renewal
    pub deferred: bool,
}

impl<I> Default for ReconnectionState<I> {
    fn default() -> Self {
        Self {
            phase: ReconnectPhase::Stable,
            attempt: 0,
            stage: RetryStage::Idle,
            last_delay: None,
            paused: false,
            deferred: false,
        }
    }
}

impl<I: MonotonicInstant> ReconnectionState<I> {
    /// When the scheduled retry fires. `None` if nothing is scheduled.
    pub fn next_retry_at(&self) -> Option<I> {
        match self.stage {
            RetryStage::Scheduled { at } => Some(at),
            _ => None,
        }
    }

    /// Earliest time at which a [`ReconnectInput::Tick`] can change state.
    pub fn next_deadline(&self) -> Option<I> {
        match self.stage {
            RetryStage::Idle => None,
            RetryStage::Scheduled { at } => Some(at),
            RetryStage::InFlight { deadline } | RetryStage::Confirming { deadline } => {
                Some(deadline)
            },
        }
    }

    /// Reconnecting and not paused: a retry is actually being pursued.
    pub fn is_actively_reconnecting(&self) -> bool {
        self.phase == ReconnectPhase::Reconnecting && !self.paused
    }
}

/// Nominal backoff for a 1-based attempt: `min(base × 2^(attempt−1), max)`.
pub fn backoff_delay(config: &ReconnectConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    config.base_delay.saturating_mul(factor).min(config.max_delay)
}

/// Backoff with ±`jitter_ratio` spread, clamped to `[floor, max_delay]`.
///
/// `roll` is mapped uniformly onto the spread. The floor keeps successive
/// delays non-decreasing once the nominal delay saturates at the cap.
pub fn jittered_delay(
    config: &ReconnectConfig,
    attempt: u32,
    roll: u64,
    floor: Option<Duration>,
) -> Duration {
    let nominal = backoff_delay(config, attempt);
    let spread = (roll as f64 / u64::MAX as f64) * 2.0 - 1.0;
    let factor = 1.0 + spread * config.jitter_ratio;

    let jittered =
        Duration::try_from_secs_f64(nominal.as_secs_f64() * factor).unwrap_or(config.max_delay);

    jittered.max(floor.unwrap_or(Duration::ZERO)).min(config.max_delay)
}

/// Pure transition function.
///
/// Returns the next state and the actions the caller must execute, in order.
pub fn transition<I: MonotonicInstant>(
    config: &ReconnectConfig,
    state: ReconnectionState<I>,
    input: ReconnectInput,
    ctx: StepContext<I>,
) -> (ReconnectionState<I>, Vec<ReconnectAction>) {
    let mut step = Step { config, state, ctx, actions: Vec::new() };
    step.apply(input);
    (step.state, step.actions)
}

struct Step<'a, I> {
    config: &'a ReconnectConfig,
    state: ReconnectionState<I>,
    ctx: StepContext<I>,
    actions: Vec<ReconnectAction>,
}

impl<I: MonotonicInstant> Step<'_, I> {
    fn apply(&mut self, input: ReconnectInput) {
        use ReconnectPhase::{Failed, Reconnecting, Stable};

        // An invalid session freezes the cycle before any input is applied
        if !self.ctx.session_valid && !self.state.paused {
            self.pause();
        }

        match (self.state.phase, input) {
            (_, ReconnectInput::SessionExpired) => self.pause(),

            (phase, ReconnectInput::SessionRenewed) => {
                if self.state.paused && self.ctx.session_valid {
                    self.state.paused = false;
                    match phase {
                        Reconnecting => {
                            let delay = self.next_delay(self.state.attempt);
                            self.arm(delay);
                        },
                        Stable if self.state.deferred => self.begin_cycle(false),
                        Stable | Failed => {},
                    }
                }
            },

            (_, ReconnectInput::ForceReconnect) if self.state.paused => {
                tracing::debug!(
                    attempt = self.state.attempt,
                    "forced reconnect ignored, session invalid"
                );
            },

            (_, ReconnectInput::ForceReconnect) => self.begin_cycle(true),

            (Stable, ReconnectInput::SustainedCritical | ReconnectInput::TransportFailed) => {
                if self.state.paused {
                    tracing::debug!(?input, "reconnect trigger deferred until session renewal");
                    self.state.deferred = true;
                } else {
                    self.begin_cycle(false);
                }
            },

            (Reconnecting, ReconnectInput::TransportFailed | ReconnectInput::SustainedCritical) => {
                // Only an attempt that is actually underway can fail; anything
                // else is a duplicate trigger.
                if matches!(
                    self.state.stage,
                    RetryStage::InFlight { .. } | RetryStage::Confirming { .. }
                ) {
                    self.attempt_failed();
                }
            },

            (Reconnecting, ReconnectInput::TransportRecovered) => {
                if !self.state.paused
                    && matches!(
                        self.state.stage,
                        RetryStage::InFlight { .. } | RetryStage::Scheduled { .. }
                    )
                {
                    self.state.stage = RetryStage::Confirming {
                        deadline: self.ctx.now + self.config.attempt_timeout,
                    };
                }
            },

            (Reconnecting, ReconnectInput::HealthySample) => {
                if matches!(self.state.stage, RetryStage::Confirming { .. }) {
                    self.state = ReconnectionState::default();
                }
            },

            (Reconnecting, ReconnectInput::Tick) => self.tick(),

            (Stable | Failed, ReconnectInput::Tick)
            | (
                Stable | Failed,
                ReconnectInput::TransportRecovered | ReconnectInput::HealthySample,
            )
            | (Failed, ReconnectInput::SustainedCritical | ReconnectInput::TransportFailed) => {},
        }
    }

    fn tick(&mut self) {
        let now = self.ctx.now;
        match self.state.stage {
            RetryStage::Scheduled { at } if now >= at => {
                if !self.ctx.session_valid {
                    self.pause();
                    return;
                }
                self.state.stage =
                    RetryStage::InFlight { deadline: now + self.config.attempt_timeout };
                self.actions.push(ReconnectAction::Reestablish { attempt: self.state.attempt });
            },
            RetryStage::InFlight { deadline } | RetryStage::Confirming { deadline }
                if now >= deadline =>
            {
                tracing::debug!(attempt = self.state.attempt, "reconnect attempt timed out");
                self.attempt_failed();
            },
            _ => {},
        }
    }

    fn begin_cycle(&mut self, immediate: bool) {
        self.actions.push(ReconnectAction::Teardown);
        self.state.phase = ReconnectPhase::Reconnecting;
        self.state.attempt = 1;
        self.state.last_delay = None;
        self.state.deferred = false;

        let delay = if immediate { Duration::ZERO } else { self.next_delay(1) };
        self.arm(delay);
    }

    fn attempt_failed(&mut self) {
        self.actions.push(ReconnectAction::Teardown);

        if self.state.attempt >= self.config.max_attempts {
            self.state.phase = ReconnectPhase::Failed;
            self.state.stage = RetryStage::Idle;
            return;
        }

        self.state.attempt += 1;
        let delay = self.next_delay(self.state.attempt);
        self.arm(delay);
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        jittered_delay(self.config, attempt, self.ctx.jitter_roll, self.state.last_delay)
    }

    /// Schedule the current attempt, unless the session forbids it.
    fn arm(&mut self, delay: Duration) {
        if self.state.paused || !self.ctx.session_valid {
            self.pause();
            return;
        }

        self.state.stage = RetryStage::Scheduled { at: self.ctx.now + delay };
        if !delay.is_zero() {
            self.state.last_delay = Some(delay);
        }
        tracing::debug!(attempt = self.state.attempt, ?delay, "reconnect attempt scheduled");
    }

    fn pause(&mut self) {
        self.state.paused = true;
        self.state.stage = RetryStage::Idle;
    }
}

/// Owns a [`ReconnectionState`] and applies [`transition`] to it.
#[derive(Debug, Clone)]
pub struct ReconnectionController<I> {
    config: ReconnectConfig,
    state: ReconnectionState<I>,
}

impl<I: MonotonicInstant> ReconnectionController<I> {
    /// Controller in the stable phase.
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, state: ReconnectionState::default() }
    }

    /// Current state.
    pub fn state(&self) -> &ReconnectionState<I> {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> ReconnectPhase {
        self.state.phase
    }

    /// Attempt number in the current cycle.
    pub fn attempt(&self) -> u32 {
        self.state.attempt
    }

    /// Whether an invalid session is holding retries back.
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Whether the current attempt's transport is up and awaiting a
    /// non-critical sample.
    pub fn is_confirming(&self) -> bool {
        matches!(self.state.stage, RetryStage::Confirming { .. })
    }

    /// When the scheduled retry fires. `None` if nothing is scheduled.
    pub fn next_retry_at(&self) -> Option<I> {
        self.state.next_retry_at()
    }

    /// Earliest time a tick can change state.
    pub fn next_deadline(&self) -> Option<I> {
        self.state.next_deadline()
    }

    /// Apply one input.
    pub fn handle(&mut self, input: ReconnectInput, ctx: StepContext<I>) -> Vec<ReconnectAction> {
        let before = self.state;
        let (next, actions) = transition(&self.config, before, input, ctx);
        self.state = next;

        if before.phase != next.phase {
            match next.phase {
                ReconnectPhase::Failed => tracing::warn!(
                    attempts = next.attempt,
                    "reconnection attempts exhausted, waiting for forced reconnect"
                ),
                phase => tracing::info!(
                    from = ?before.phase,
                    to = ?phase,
                    attempt = next.attempt,
                    ?input,
                    "reconnection phase changed"
                ),
            }
        }
        if before.paused != next.paused {
            tracing::info!(paused = next.paused, attempt = next.attempt, "reconnection pause toggled");
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    /// Roll that maps to zero spread (nominal delay).
    const MID_ROLL: u64 = u64::MAX / 2;

    #[allow(clippy::disallowed_methods)]
    fn t0() -> Instant {
        Instant::now()
    }

    fn ctx(now: Instant) -> StepContext<Instant> {
        StepContext { now, session_valid: true, jitter_roll: MID_ROLL }
    }

    fn approx(actual: Duration, expected: Duration) -> bool {
        let diff = actual.as_secs_f64() - expected.as_secs_f64();
        diff.abs() < 1e-6
    }

    #[test]
    fn nominal_backoff_doubles_then_caps() {
        let config = ReconnectConfig::default();
        let delays: Vec<_> = (1..=8).map(|n| backoff_delay(&config, n).as_secs()).collect();

        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
        assert_eq!(backoff_delay(&config, u32::MAX), config.max_delay);
    }

    #[test]
    fn jitter_stays_within_spread() {
        let config = ReconnectConfig::default();

        let low = jittered_delay(&config, 1, 0, None);
        let high = jittered_delay(&config, 1, u64::MAX, None);
        let mid = jittered_delay(&config, 1, MID_ROLL, None);

        assert!(approx(low, Duration::from_millis(800)));
        assert!(approx(high, Duration::from_millis(1200)));
        assert!(approx(mid, Duration::from_secs(1)));
    }

    #[test]
    fn jitter_respects_floor_and_cap() {
        let config = ReconnectConfig::default();

        let capped = jittered_delay(&config, 7, u64::MAX, None);
        assert_eq!(capped, config.max_delay);

        let floored = jittered_delay(&config, 7, 0, Some(Duration::from_secs(29)));
        assert_eq!(floored, Duration::from_secs(29));
    }

    #[test]
    fn transport_failure_starts_cycle_with_backoff() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        let actions = controller.handle(ReconnectInput::TransportFailed, ctx(t0));

        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.phase(), ReconnectPhase::Reconnecting);
        assert_eq!(controller.attempt(), 1);
        assert_eq!(controller.next_retry_at(), Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn force_reconnect_fires_immediately() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::ForceReconnect, ctx(t0));
        assert_eq!(controller.next_retry_at(), Some(t0));

        let actions = controller.handle(ReconnectInput::Tick, ctx(t0));
        assert_eq!(actions, vec![ReconnectAction::Reestablish { attempt: 1 }]);
        assert_eq!(controller.next_retry_at(), None);
    }

    #[test]
    fn duplicate_triggers_enter_once() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let state = *controller.state();

        let actions = controller.handle(ReconnectInput::SustainedCritical, ctx(t0));
        assert!(actions.is_empty());
        assert_eq!(*controller.state(), state);
    }

    #[test]
    fn recovery_needs_healthy_sample() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let t1 = t0 + Duration::from_secs(1);
        controller.handle(ReconnectInput::Tick, ctx(t1));
        controller.handle(ReconnectInput::TransportRecovered, ctx(t1));

        assert!(controller.is_confirming());
        assert_eq!(controller.phase(), ReconnectPhase::Reconnecting);

        controller.handle(ReconnectInput::HealthySample, ctx(t1));
        assert_eq!(controller.phase(), ReconnectPhase::Stable);
        assert_eq!(controller.attempt(), 0);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn healthy_sample_without_recovery_is_ignored() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        controller.handle(ReconnectInput::HealthySample, ctx(t0));

        assert_eq!(controller.phase(), ReconnectPhase::Reconnecting);
        assert_eq!(controller.attempt(), 1);
    }

    #[test]
    fn failed_attempt_increments_and_backs_off() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let t1 = t0 + Duration::from_secs(1);
        controller.handle(ReconnectInput::Tick, ctx(t1));

        let actions = controller.handle(ReconnectInput::TransportFailed, ctx(t1));
        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.attempt(), 2);
        assert_eq!(controller.next_retry_at(), Some(t1 + Duration::from_secs(2)));
    }

    #[test]
    fn unresolved_attempt_times_out() {
        let t0 = t0();
        let config = ReconnectConfig::default();
        let mut controller = ReconnectionController::new(config);

        controller.handle(ReconnectInput::ForceReconnect, ctx(t0));
        controller.handle(ReconnectInput::Tick, ctx(t0));

        let before_deadline = t0 + config.attempt_timeout - Duration::from_millis(1);
        assert!(controller.handle(ReconnectInput::Tick, ctx(before_deadline)).is_empty());

        let at_deadline = t0 + config.attempt_timeout;
        let actions = controller.handle(ReconnectInput::Tick, ctx(at_deadline));
        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.attempt(), 2);
    }

    #[test]
    fn exhausting_attempts_fails() {
        let t0 = t0();
        let config = ReconnectConfig { max_attempts: 2, ..ReconnectConfig::default() };
        let mut controller = ReconnectionController::new(config);

        controller.handle(ReconnectInput::ForceReconnect, ctx(t0));
        let mut now = t0;
        for _ in 0..2 {
            now = controller.next_retry_at().unwrap();
            controller.handle(ReconnectInput::Tick, ctx(now));
            controller.handle(ReconnectInput::TransportFailed, ctx(now));
        }

        assert_eq!(controller.phase(), ReconnectPhase::Failed);
        assert_eq!(controller.attempt(), 2);
        assert_eq!(controller.next_deadline(), None);

        // Terminal: automatic triggers are ignored
        assert!(controller.handle(ReconnectInput::TransportFailed, ctx(now)).is_empty());
        assert!(controller.handle(ReconnectInput::SustainedCritical, ctx(now)).is_empty());
        assert_eq!(controller.phase(), ReconnectPhase::Failed);
    }

    #[test]
    fn force_from_failed_restarts_cycle() {
        let t0 = t0();
        let config = ReconnectConfig { max_attempts: 1, ..ReconnectConfig::default() };
        let mut controller = ReconnectionController::new(config);

        controller.handle(ReconnectInput::ForceReconnect, ctx(t0));
        controller.handle(ReconnectInput::Tick, ctx(t0));
        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        assert_eq!(controller.phase(), ReconnectPhase::Failed);

        let actions = controller.handle(ReconnectInput::ForceReconnect, ctx(t0));
        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.phase(), ReconnectPhase::Reconnecting);
        assert_eq!(controller.attempt(), 1);
        assert_eq!(controller.next_retry_at(), Some(t0));
    }

    #[test]
    fn session_expiry_pauses_and_freezes_attempt() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let mut now = t0;
        for _ in 0..2 {
            now = controller.next_retry_at().unwrap();
            controller.handle(ReconnectInput::Tick, ctx(now));
            controller.handle(ReconnectInput::TransportFailed, ctx(now));
        }
        assert_eq!(controller.attempt(), 3);

        let expired = StepContext { session_valid: false, ..ctx(now) };
        controller.handle(ReconnectInput::SessionExpired, expired);

        assert!(controller.is_paused());
        assert_eq!(controller.attempt(), 3);
        assert_eq!(controller.next_deadline(), None);
        assert!(!controller.state().is_actively_reconnecting());

        // Nothing fires while paused, however long we wait
        let later = StepContext { now: now + Duration::from_secs(120), ..expired };
        assert!(controller.handle(ReconnectInput::Tick, later).is_empty());
        assert!(controller.handle(ReconnectInput::TransportFailed, later).is_empty());
        assert_eq!(controller.attempt(), 3);
    }

    #[test]
    fn renewal_resumes_current_attempt() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        controller
            .handle(ReconnectInput::SessionExpired, StepContext { session_valid: false, ..ctx(t0) });

        let t1 = t0 + Duration::from_secs(30);
        controller.handle(ReconnectInput::SessionRenewed, ctx(t1));

        assert!(!controller.is_paused());
        assert_eq!(controller.attempt(), 1);
        assert!(controller.next_retry_at().is_some_and(|at| at > t1));
    }

    #[test]
    fn trigger_with_invalid_session_waits_for_renewal() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        let invalid = StepContext { session_valid: false, ..ctx(t0) };
        let actions = controller.handle(ReconnectInput::TransportFailed, invalid);

        assert!(actions.is_empty());
        assert_eq!(controller.phase(), ReconnectPhase::Stable);
        assert_eq!(controller.attempt(), 0);
        assert!(controller.is_paused());
        assert!(controller.state().deferred);

        let t1 = t0 + Duration::from_secs(5);
        let actions = controller.handle(ReconnectInput::SessionRenewed, ctx(t1));
        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.phase(), ReconnectPhase::Reconnecting);
        assert_eq!(controller.attempt(), 1);
        assert_eq!(controller.next_retry_at(), Some(t1 + Duration::from_secs(1)));
        assert!(!controller.state().deferred);
    }

    #[test]
    fn force_while_paused_is_ignored() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let t1 = t0 + Duration::from_secs(1);
        controller.handle(ReconnectInput::Tick, ctx(t1));
        controller.handle(ReconnectInput::TransportFailed, ctx(t1));
        assert_eq!(controller.attempt(), 2);

        let expired = StepContext { session_valid: false, ..ctx(t1) };
        controller.handle(ReconnectInput::SessionExpired, expired);
        let paused = *controller.state();

        assert!(controller.handle(ReconnectInput::ForceReconnect, expired).is_empty());
        assert_eq!(*controller.state(), paused);

        // Renewal alone does not count as a forced reconnect
        let t2 = t1 + Duration::from_secs(10);
        assert!(controller.handle(ReconnectInput::SessionRenewed, ctx(t2)).is_empty());
        assert_eq!(controller.attempt(), 2);

        let actions = controller.handle(ReconnectInput::ForceReconnect, ctx(t2));
        assert_eq!(actions, vec![ReconnectAction::Teardown]);
        assert_eq!(controller.attempt(), 1);
        assert_eq!(controller.next_retry_at(), Some(t2));
    }

    #[test]
    fn renewal_under_invalid_session_stays_paused() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        controller.handle(ReconnectInput::TransportFailed, ctx(t0));
        let expired = StepContext { session_valid: false, ..ctx(t0) };
        controller.handle(ReconnectInput::SessionExpired, expired);

        assert!(controller.handle(ReconnectInput::SessionRenewed, expired).is_empty());
        assert!(controller.is_paused());
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn stable_ignores_recovery_noise() {
        let t0 = t0();
        let mut controller = ReconnectionController::new(ReconnectConfig::default());

        assert!(controller.handle(ReconnectInput::TransportRecovered, ctx(t0)).is_empty());
        assert!(controller.handle(ReconnectInput::HealthySample, ctx(t0)).is_empty());
        assert!(controller.handle(ReconnectInput::Tick, ctx(t0)).is_empty());
        assert_eq!(*controller.state(), ReconnectionState::default());
    }
}
