//! Property-based tests for the reconnection state machine.
//!
//! Drives the pure transition function with arbitrary jitter rolls and input
//! sequences and checks backoff bounds, retry exhaustion and session
//! precedence.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use roomlink_core::{
    ReconnectAction, ReconnectConfig, ReconnectInput, ReconnectPhase, ReconnectionState,
    RetryStage, StepContext, reconnect::transition,
};

#[allow(clippy::disallowed_methods)]
fn t0() -> Instant {
    Instant::now()
}

fn input_strategy() -> impl Strategy<Value = ReconnectInput> {
    prop_oneof![
        2 => Just(ReconnectInput::SustainedCritical),
        3 => Just(ReconnectInput::TransportFailed),
        2 => Just(ReconnectInput::TransportRecovered),
        2 => Just(ReconnectInput::HealthySample),
        1 => Just(ReconnectInput::ForceReconnect),
        4 => Just(ReconnectInput::Tick),
        1 => Just(ReconnectInput::SessionExpired),
        1 => Just(ReconnectInput::SessionRenewed),
    ]
}

/// Fail every attempt until the controller gives up, collecting armed delays.
fn exhaust(
    config: &ReconnectConfig,
    rolls: &[u64],
) -> (ReconnectionState<Instant>, Vec<Duration>) {
    let mut now = t0();
    let mut state = ReconnectionState::default();
    let mut delays = Vec::new();
    let mut rolls = rolls.iter().copied().cycle();

    let ctx = |now: Instant, roll: u64| StepContext { now, session_valid: true, jitter_roll: roll };

    let roll = rolls.next().unwrap_or(0);
    (state, _) = transition(config, state, ReconnectInput::TransportFailed, ctx(now, roll));

    while let RetryStage::Scheduled { at } = state.stage {
        delays.push(at - now);
        now = at;
        let roll = rolls.next().unwrap_or(0);
        (state, _) = transition(config, state, ReconnectInput::Tick, ctx(now, roll));
        (state, _) = transition(config, state, ReconnectInput::TransportFailed, ctx(now, roll));
    }

    (state, delays)
}

proptest! {
    #[test]
    fn prop_delays_non_decreasing_and_capped(
        rolls in prop::collection::vec(any::<u64>(), 1..16),
    ) {
        let config = ReconnectConfig::default();
        let (state, delays) = exhaust(&config, &rolls);

        prop_assert_eq!(delays.len(), config.max_attempts as usize);
        for pair in delays.windows(2) {
            prop_assert!(pair[0] <= pair[1], "delays decreased: {:?}", delays);
        }
        prop_assert!(delays.iter().all(|d| *d <= config.max_delay));

        prop_assert_eq!(state.phase, ReconnectPhase::Failed);
        prop_assert_eq!(state.attempt, config.max_attempts);
        prop_assert_eq!(state.next_deadline(), None);
    }

    #[test]
    fn prop_first_automatic_retry_near_base_delay(roll in any::<u64>()) {
        let config = ReconnectConfig::default();
        let now = t0();
        let ctx = StepContext { now, session_valid: true, jitter_roll: roll };

        let (state, _) =
            transition(&config, ReconnectionState::default(), ReconnectInput::SustainedCritical, ctx);

        let delay = state.next_retry_at().map(|at| at - now);
        prop_assert!(delay.is_some_and(|d|
            d >= Duration::from_millis(799) && d <= Duration::from_millis(1201)
        ));
        prop_assert_eq!(state.attempt, 1);
    }

    #[test]
    fn prop_expired_session_freezes_attempt(
        failures in 0u32..7,
        inputs in prop::collection::vec((input_strategy(), 0u64..60_000), 1..40),
    ) {
        let config = ReconnectConfig::default();
        let mut now = t0();
        let ctx = |now: Instant, session_valid: bool| {
            StepContext { now, session_valid, jitter_roll: u64::MAX / 2 }
        };

        let (mut state, _) = transition(
            &config,
            ReconnectionState::default(),
            ReconnectInput::TransportFailed,
            ctx(now, true),
        );
        for _ in 0..failures {
            now = state.next_retry_at().unwrap();
            (state, _) = transition(&config, state, ReconnectInput::Tick, ctx(now, true));
            (state, _) = transition(&config, state, ReconnectInput::TransportFailed, ctx(now, true));
        }
        let attempt = failures + 1;
        prop_assert_eq!(state.attempt, attempt);

        (state, _) = transition(&config, state, ReconnectInput::SessionExpired, ctx(now, false));

        for (input, advance_ms) in inputs {
            if input == ReconnectInput::SessionRenewed {
                continue;
            }
            now += Duration::from_millis(advance_ms);
            let (next, actions) = transition(&config, state, input, ctx(now, false));
            state = next;

            prop_assert!(actions.is_empty(), "{:?} emitted {:?}", input, actions);
            prop_assert_eq!(state.attempt, attempt);
            prop_assert_eq!(state.phase, ReconnectPhase::Reconnecting);
            prop_assert_eq!(state.next_deadline(), None);
        }
    }

    #[test]
    fn prop_invariants_hold_under_arbitrary_inputs(
        steps in prop::collection::vec((input_strategy(), 0u64..5_000, any::<u64>()), 1..80),
    ) {
        let config = ReconnectConfig::default();
        let mut now = t0();
        let mut session_valid = true;
        let mut state: ReconnectionState<Instant> = ReconnectionState::default();

        for (input, advance_ms, roll) in steps {
            now += Duration::from_millis(advance_ms);
            match input {
                ReconnectInput::SessionExpired => session_valid = false,
                ReconnectInput::SessionRenewed => session_valid = true,
                _ => {},
            }

            let before = state;
            let ctx = StepContext { now, session_valid, jitter_roll: roll };
            let (next, actions) = transition(&config, state, input, ctx);
            state = next;

            // Invalid session: the cycle is frozen, whatever the input
            if !session_valid {
                prop_assert!(state.paused);
                prop_assert_eq!(state.next_deadline(), None);
                prop_assert!(actions.is_empty(), "{:?} under invalid session: {:?}", input, actions);
                prop_assert_eq!(state.attempt, before.attempt);
                prop_assert_eq!(state.phase, before.phase);
                prop_assert!(!state.is_actively_reconnecting());
            }

            if state.deferred {
                prop_assert_eq!(state.phase, ReconnectPhase::Stable);
                prop_assert!(state.paused);
            }

            match state.phase {
                ReconnectPhase::Stable => prop_assert_eq!(state.attempt, 0),
                ReconnectPhase::Reconnecting | ReconnectPhase::Failed => {
                    prop_assert!(state.attempt >= 1 && state.attempt <= config.max_attempts);
                },
            }

            if state.phase == ReconnectPhase::Failed {
                prop_assert_eq!(state.next_deadline(), None);
            }

            // Repeated triggers never restart an active cycle
            if before.phase == ReconnectPhase::Reconnecting
                && matches!(input, ReconnectInput::SustainedCritical | ReconnectInput::TransportFailed)
            {
                prop_assert!(state.attempt >= before.attempt || state.phase == ReconnectPhase::Stable);
            }
        }
    }
}

#[test]
fn force_reconnect_from_failed_resets_attempts() {
    let config = ReconnectConfig::default();
    let (state, _) = exhaust(&config, &[0]);
    assert_eq!(state.phase, ReconnectPhase::Failed);

    let now = t0();
    let ctx = StepContext { now, session_valid: true, jitter_roll: 0 };
    let (state, actions) = transition(&config, state, ReconnectInput::ForceReconnect, ctx);

    assert_eq!(actions, vec![ReconnectAction::Teardown]);
    assert_eq!(state.phase, ReconnectPhase::Reconnecting);
    assert_eq!(state.attempt, 1);
    assert_eq!(state.next_retry_at(), Some(now));
}
