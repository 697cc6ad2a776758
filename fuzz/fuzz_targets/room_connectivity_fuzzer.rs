//! Fuzz target for the room connectivity orchestrator
//!
//! Applies arbitrary operation sequences to a `ModelWorld`, which runs the
//! real orchestrator under a manual clock.
//!
//! # Invariants
//!
//! - Standard connectivity invariants hold after every operation
//! - Session banner matches the reference model
//! - Every state change is published
//! - Deadlines always move time forward

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomlink_harness::{ModelWorld, Operation};

fuzz_target!(|input: (u64, Vec<Operation>)| {
    let (seed, ops) = input;
    let Ok(mut world) = ModelWorld::new(seed) else {
        return;
    };

    for op in ops {
        if let Err(error) = world.apply(op) {
            panic!("seed {seed}: {error}");
        }
    }
});
