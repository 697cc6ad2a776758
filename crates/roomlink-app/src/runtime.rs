//! Generic runtime for connectivity orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`RoomConnectivity`]: pure connectivity state machine
//! - [`Driver`]: platform-specific I/O
//! - [`Environment`]: clock, timers and randomness
//!
//! There is exactly one timer: a sleep until
//! [`RoomConnectivity::next_deadline`], raced against the driver's next event.
//! Dropping the runtime cancels everything.

use std::collections::VecDeque;

use roomlink_core::{ConfigError, ConnectivityConfig, Environment, MonotonicInstant};

use crate::{ConnectivityAction, ConnectivityEvent, Driver, RoomConnectivity, RoomConnectivityState};

/// Generic runtime that orchestrates a [`RoomConnectivity`] and a [`Driver`].
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment supplying time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    room: RoomConnectivity<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Join a room: create the runtime with fresh connectivity state.
    pub fn new(driver: D, env: E, config: ConnectivityConfig) -> Result<Self, ConfigError> {
        let now = env.now();
        let room = RoomConnectivity::new(env.clone(), config, now)?;
        Ok(Self { driver, env, room })
    }

    /// Create a runtime around existing connectivity state.
    pub fn with_room(driver: D, env: E, room: RoomConnectivity<E>) -> Self {
        Self { driver, env, room }
    }

    /// Run the event loop until the room is left or the event source closes.
    ///
    /// Publishes the initial state first, then:
    /// 1. Waits for a driver event or the next deadline, whichever is first
    /// 2. Feeds it to the state machine
    /// 3. Executes the resulting actions, feeding follow-up results back in
    ///
    /// Returns the last observable state.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver's event source or presentation layer
    /// fails. Transport errors are absorbed into the state machine.
    pub async fn run(mut self) -> Result<RoomConnectivityState, D::Error> {
        self.driver.publish(&self.room.state())?;

        while let Some(deadline) = self.room.next_deadline() {
            let wait = deadline.saturating_since(self.env.now());

            let event = tokio::select! {
                event = self.driver.next_event() => match event? {
                    Some(event) => ConnectivityEvent::from(event),
                    None => {
                        tracing::debug!("driver event source closed");
                        ConnectivityEvent::Leave
                    },
                },
                () = self.env.sleep(wait) => ConnectivityEvent::Tick,
            };

            self.dispatch(event).await?;
        }

        Ok(self.room.state())
    }

    /// Feed one event and execute every action it produces.
    ///
    /// # Errors
    ///
    /// Returns an error if publishing fails.
    pub async fn dispatch(&mut self, event: ConnectivityEvent) -> Result<(), D::Error> {
        let now = self.env.now();
        let mut pending: VecDeque<_> = self.room.handle(now, event).into();

        while let Some(action) = pending.pop_front() {
            let follow_up = self.execute(action).await?;
            if let Some(event) = follow_up {
                let now = self.env.now();
                pending.extend(self.room.handle(now, event));
            }
        }

        Ok(())
    }

    /// Execute a single action, returning the event it produced, if any.
    async fn execute(
        &mut self,
        action: ConnectivityAction,
    ) -> Result<Option<ConnectivityEvent>, D::Error> {
        match action {
            ConnectivityAction::PollStats => {
                let stats = match self.driver.poll_stats().await {
                    Ok(stats) => stats,
                    Err(error) => {
                        tracing::warn!(%error, "transport stats read failed");
                        None
                    },
                };
                Ok(Some(ConnectivityEvent::StatsPolled(stats)))
            },
            ConnectivityAction::Teardown => {
                if let Err(error) = self.driver.teardown().await {
                    tracing::warn!(%error, "transport teardown failed");
                }
                Ok(None)
            },
            ConnectivityAction::Reestablish { attempt } => {
                tracing::debug!(attempt, "re-establishing transport");
                match self.driver.reestablish(attempt).await {
                    Ok(()) => Ok(None),
                    Err(error) => {
                        tracing::warn!(attempt, %error, "re-establish failed");
                        Ok(Some(ConnectivityEvent::TransportFailed))
                    },
                }
            },
            ConnectivityAction::Publish(state) => {
                self.driver.publish(&state)?;
                Ok(None)
            },
        }
    }

    /// Get a reference to the connectivity state machine.
    pub fn room(&self) -> &RoomConnectivity<E> {
        &self.room
    }

    /// Get a reference to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
