//! Model-based testing support.
//!
//! [`Operation`]s are generated randomly and applied to a [`ModelWorld`],
//! which runs the real state machine under a manual clock and compares it
//! against the [`SessionModel`] reference and the invariant registry after
//! every step.

mod operation;
mod session;
mod world;

pub use operation::Operation;
pub use session::SessionModel;
pub use world::{ModelWorld, WorldError};
