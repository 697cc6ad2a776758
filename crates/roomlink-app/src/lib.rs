//! Application layer for Roomlink
//!
//! Pure orchestration state machine and generic runtime for room
//! connectivity, so deterministic simulation tests exercise the same code
//! that runs in production.
//!
//! # Components
//!
//! - [`RoomConnectivity`]: composes sampler, classifier, reconnection
//!   controller and session guard into one observable state
//! - [`RoomConnectivityState`]: the view model handed to the UI
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using Driver
//! - [`SystemEnv`]: production clock, timers and randomness

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod driver;
mod event;
mod room;
mod runtime;
mod state;
mod system_env;

pub use action::ConnectivityAction;
pub use driver::{Driver, DriverEvent};
pub use event::ConnectivityEvent;
pub use room::RoomConnectivity;
pub use runtime::Runtime;
pub use state::RoomConnectivityState;
pub use system_env::SystemEnv;
