//! Deterministic simulation harness for Roomlink connectivity testing.
//!
//! Tokio-clock implementations of the Environment and Driver traits for
//! deterministic, reproducible testing of reconnection and session handling.
//!
//! # Model-Based Testing
//!
//! The `model` module applies random operation sequences to the real
//! orchestrator under a manual clock and compares its observable state with
//! a reference model after every step.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the
//! connectivity invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    AttemptsWithinCap, ConnectivitySnapshot, ExpiredMasksReconnecting, ExpiredSessionDisarms,
    FailedIsQuiet, Invariant, InvariantKind, InvariantRegistry, InvariantResult,
    StableMeansNoAttempts, Violation,
};
pub use model::{ModelWorld, Operation, SessionModel, WorldError};
pub use sim_driver::{DriverCall, ReestablishOutcome, SimDriver, SimDriverError, SimHandle};
pub use sim_env::SimEnv;
