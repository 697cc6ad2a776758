//! Fuzz target for the reconnection transition function
//!
//! # Strategy
//!
//! - Arbitrary inputs in arbitrary order, including ones that make no sense
//!   in the current phase
//! - Arbitrary jitter rolls and session validity
//! - Time only moves forward, in steps up to about a minute
//!
//! # Invariants
//!
//! - Attempt number never exceeds `max_attempts`
//! - Stable means attempt 0 and nothing armed
//! - Failed arms nothing and only `ForceReconnect` leaves it
//! - A paused controller arms nothing
//! - An invalid session freezes phase and attempt and emits nothing
//! - A deferred trigger only exists in a paused Stable controller
//! - Re-establish carries the current attempt number
//! - Armed retries never fire earlier than scheduled and never later than
//!   `max_delay` after scheduling

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomlink_core::{
    ReconnectAction, ReconnectConfig, ReconnectInput, ReconnectPhase, ReconnectionController,
    RetryStage, StepContext,
};

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Input {
    SustainedCritical,
    TransportFailed,
    TransportRecovered,
    HealthySample,
    ForceReconnect,
    Tick,
    SessionExpired,
    SessionRenewed,
}

impl From<Input> for ReconnectInput {
    fn from(input: Input) -> Self {
        match input {
            Input::SustainedCritical => Self::SustainedCritical,
            Input::TransportFailed => Self::TransportFailed,
            Input::TransportRecovered => Self::TransportRecovered,
            Input::HealthySample => Self::HealthySample,
            Input::ForceReconnect => Self::ForceReconnect,
            Input::Tick => Self::Tick,
            Input::SessionExpired => Self::SessionExpired,
            Input::SessionRenewed => Self::SessionRenewed,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
struct Step {
    input: Input,
    advance_ms: u16,
    session_valid: bool,
    jitter_roll: u64,
}

fuzz_target!(|steps: Vec<Step>| {
    let config = ReconnectConfig::default();
    let mut controller = ReconnectionController::new(config);
    let mut now = Instant::now();

    for step in steps {
        now += Duration::from_millis(u64::from(step.advance_ms));
        let before = *controller.state();
        let ctx = StepContext { now, session_valid: step.session_valid, jitter_roll: step.jitter_roll };

        let actions = controller.handle(step.input.into(), ctx);
        let after = *controller.state();

        assert!(after.attempt <= config.max_attempts, "attempt {} over cap", after.attempt);

        match after.phase {
            ReconnectPhase::Stable => {
                assert_eq!(after.attempt, 0, "stable with attempts");
                assert_eq!(after.stage, RetryStage::Idle, "stable with armed retry");
            },
            ReconnectPhase::Failed => {
                assert_eq!(after.stage, RetryStage::Idle, "failed with armed retry");
            },
            ReconnectPhase::Reconnecting => assert!(after.attempt >= 1, "reconnecting at attempt 0"),
        }

        if before.phase == ReconnectPhase::Failed && after.phase != ReconnectPhase::Failed {
            assert!(matches!(step.input, Input::ForceReconnect), "left failed via {:?}", step.input);
        }

        if after.paused {
            assert_eq!(after.stage, RetryStage::Idle, "paused with armed retry");
        }

        if !step.session_valid {
            assert!(actions.is_empty(), "{:?} acted under invalid session", step.input);
            assert_eq!(after.attempt, before.attempt, "attempt moved under invalid session");
            assert_eq!(after.phase, before.phase, "phase moved under invalid session");
        }

        if after.deferred {
            assert_eq!(after.phase, ReconnectPhase::Stable, "deferred outside stable");
            assert!(after.paused, "deferred while not paused");
        }

        if let RetryStage::Scheduled { at } = after.stage
            && after.stage != before.stage
        {
            assert!(at >= now, "retry scheduled in the past");
            assert!(at <= now + config.max_delay, "retry beyond the backoff ceiling");
        }

        for action in actions {
            if let ReconnectAction::Reestablish { attempt } = action {
                assert_eq!(attempt, after.attempt, "re-establish for a stale attempt");
                assert!(
                    !matches!(before.stage, RetryStage::Scheduled { at } if at > now),
                    "retry fired early"
                );
            }
        }
    }
});
