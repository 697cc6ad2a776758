//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` stands in for the peer connection, the auth token store and
//! the view layer. It implements [`Driver`] so the same
//! [`roomlink_app::Runtime`] orchestration code runs in production and in
//! simulation.
//!
//! Tests steer it through a cloneable [`SimHandle`]: inject collaborator
//! events, change the link profile, decide how re-establish attempts end, and
//! read back everything the runtime asked for.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use roomlink_app::{Driver, DriverEvent, RoomConnectivityState};
use roomlink_core::TransportStats;
use tokio::sync::mpsc;

use crate::invariants::{ConnectivitySnapshot, InvariantRegistry, Violation};

/// Error type for the simulation driver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimDriverError {
    /// A scripted collaborator failure.
    #[error("scripted failure: {0}")]
    Scripted(&'static str),

    /// A published state broke an invariant.
    #[error("invariant violation: {}", format_violations(.0))]
    Invariant(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// How the next re-establish attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReestablishOutcome {
    /// New transport comes up.
    #[default]
    Recover,
    /// New transport fails.
    Fail,
    /// No answer; the attempt times out.
    Hang,
    /// The collaborator rejects the request outright.
    Reject,
}

/// Everything the runtime asked the collaborators to do, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCall {
    /// Transport statistics read.
    PollStats,
    /// Transport torn down.
    Teardown,
    /// Re-establish requested.
    Reestablish {
        /// Attempt number.
        attempt: u32,
    },
    /// State published to the view layer.
    Publish(RoomConnectivityState),
}

#[derive(Debug)]
struct SharedState {
    link_up: bool,
    link: TransportStats,
    outcomes: VecDeque<ReestablishOutcome>,
    default_outcome: ReestablishOutcome,
    calls: Vec<DriverCall>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            link_up: true,
            link: TransportStats::new(40.0, 4.0),
            outcomes: VecDeque::new(),
            default_outcome: ReestablishOutcome::Recover,
            calls: Vec::new(),
        }
    }
}

/// Test-side control surface for a [`SimDriver`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SharedState>>,
    events: mpsc::UnboundedSender<DriverEvent>,
}

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a collaborator notification to the runtime.
    pub fn inject(&self, event: DriverEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(?event, "runtime gone, event dropped");
        }
    }

    /// Change what the transport reports from now on.
    pub fn set_link(&self, rtt_ms: f64, jitter_ms: f64) {
        self.lock().link = TransportStats::new(rtt_ms, jitter_ms);
    }

    /// Drop the transport and report the failure, as a remote hangup would.
    pub fn fail_transport(&self) {
        self.lock().link_up = false;
        self.inject(DriverEvent::TransportFailed);
    }

    /// Queue outcomes for the next re-establish attempts, in order.
    pub fn script_reestablish(&self, outcomes: impl IntoIterator<Item = ReestablishOutcome>) {
        self.lock().outcomes.extend(outcomes);
    }

    /// Outcome used once the script runs out.
    pub fn set_default_outcome(&self, outcome: ReestablishOutcome) {
        self.lock().default_outcome = outcome;
    }

    /// Whether a transport is currently up.
    pub fn link_up(&self) -> bool {
        self.lock().link_up
    }

    /// All calls so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// All published states so far.
    pub fn published(&self) -> Vec<RoomConnectivityState> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Publish(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Attempt numbers passed to re-establish so far.
    pub fn reestablish_attempts(&self) -> Vec<u32> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Reestablish { attempt } => Some(*attempt),
                _ => None,
            })
            .collect()
    }
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] so the same [`roomlink_app::Runtime`] orchestration
/// code runs in both production and simulation tests.
#[derive(Debug)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    events: mpsc::UnboundedReceiver<DriverEvent>,
    /// Loopback for outcomes of re-establish attempts
    loopback: mpsc::UnboundedSender<DriverEvent>,
    invariants: Option<InvariantRegistry>,
}

impl SimDriver {
    /// Create a driver and the handle that controls it.
    ///
    /// The driver's event source closes once every handle is dropped.
    pub fn new() -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SharedState::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SimHandle { state: Arc::clone(&state), events: tx.clone() };
        let driver = Self { state, events: rx, loopback: tx, invariants: None };
        (driver, handle)
    }

    /// Enable invariant checking on every published state.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, event: DriverEvent) {
        // Receiver lives in self, so this only fails mid-drop
        let _ = self.loopback.send(event);
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn next_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        // The driver holds a loopback sender, so close once only it remains
        if Arc::strong_count(&self.state) == 1 && self.events.is_empty() {
            return Ok(None);
        }
        Ok(self.events.recv().await)
    }

    async fn poll_stats(&mut self) -> Result<Option<TransportStats>, Self::Error> {
        let mut state = self.lock();
        state.calls.push(DriverCall::PollStats);
        Ok(state.link_up.then_some(state.link))
    }

    async fn teardown(&mut self) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Teardown);
        state.link_up = false;
        Ok(())
    }

    async fn reestablish(&mut self, attempt: u32) -> Result<(), Self::Error> {
        let outcome = {
            let mut state = self.lock();
            state.calls.push(DriverCall::Reestablish { attempt });
            let outcome = state.outcomes.pop_front().unwrap_or(state.default_outcome);
            if outcome == ReestablishOutcome::Recover {
                state.link_up = true;
            }
            outcome
        };

        match outcome {
            ReestablishOutcome::Recover => self.report(DriverEvent::TransportRecovered),
            ReestablishOutcome::Fail => self.report(DriverEvent::TransportFailed),
            ReestablishOutcome::Hang => {},
            ReestablishOutcome::Reject => {
                return Err(SimDriverError::Scripted("re-establish rejected"));
            },
        }
        Ok(())
    }

    fn publish(&mut self, state: &RoomConnectivityState) -> Result<(), Self::Error> {
        self.lock().calls.push(DriverCall::Publish(*state));

        if let Some(registry) = &self.invariants {
            registry
                .check_all(&ConnectivitySnapshot::from_state(*state))
                .map_err(SimDriverError::Invariant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_events_are_delivered_in_order() {
        let (mut driver, handle) = SimDriver::new();
        handle.inject(DriverEvent::TransportFailed);
        handle.inject(DriverEvent::ForceReconnect);

        assert_eq!(driver.next_event().await.unwrap(), Some(DriverEvent::TransportFailed));
        assert_eq!(driver.next_event().await.unwrap(), Some(DriverEvent::ForceReconnect));
    }

    #[tokio::test]
    async fn dropping_handle_closes_event_source() {
        let (mut driver, handle) = SimDriver::new();
        handle.inject(DriverEvent::Leave);
        drop(handle);

        assert_eq!(driver.next_event().await.unwrap(), Some(DriverEvent::Leave));
        assert_eq!(driver.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn teardown_silences_stats() {
        let (mut driver, handle) = SimDriver::new();
        handle.set_link(120.0, 9.0);

        assert_eq!(driver.poll_stats().await.unwrap(), Some(TransportStats::new(120.0, 9.0)));
        driver.teardown().await.unwrap();
        assert_eq!(driver.poll_stats().await.unwrap(), None);
        assert!(!handle.link_up());
    }

    #[tokio::test]
    async fn scripted_outcomes_are_reported() {
        let (mut driver, handle) = SimDriver::new();
        handle.script_reestablish([ReestablishOutcome::Fail, ReestablishOutcome::Recover]);

        driver.reestablish(1).await.unwrap();
        assert_eq!(driver.next_event().await.unwrap(), Some(DriverEvent::TransportFailed));

        driver.reestablish(2).await.unwrap();
        assert_eq!(driver.next_event().await.unwrap(), Some(DriverEvent::TransportRecovered));
        assert!(handle.link_up());
        assert_eq!(handle.reestablish_attempts(), vec![1, 2]);
    }

    #[tokio::test]
    async fn rejected_reestablish_errors() {
        let (mut driver, handle) = SimDriver::new();
        handle.set_default_outcome(ReestablishOutcome::Reject);

        assert!(matches!(driver.reestablish(1).await, Err(SimDriverError::Scripted(_))));
    }

    #[test]
    fn invariant_breaking_publish_errors() {
        let (driver, _handle) = SimDriver::new();
        let mut driver = driver.with_invariants(InvariantRegistry::standard(8));

        let broken = RoomConnectivityState {
            reconnecting: true,
            session_expired: true,
            reconnect_attempts: 1,
            phase: roomlink_core::ReconnectPhase::Reconnecting,
            ..RoomConnectivityState::default()
        };

        assert!(matches!(driver.publish(&broken), Err(SimDriverError::Invariant(_))));
    }
}
