//! Fuzz target for the room coordinator driver
//!
//! Drives the real `ServerDriver` (through `SimServer`) with arbitrary
//! operation sequences, mirroring them into the reference model.
//!
//! # Strategy
//!
//! - Operations: connect, join, leave, set-language, code and chat relays,
//!   abrupt disconnects
//! - Shared identities: several clients map onto the same username
//! - Raw frames: arbitrary text interleaved with well-formed traffic
//!
//! # Invariants
//!
//! - Driver NEVER returns an error for runtime-consistent input
//! - Every registered invariant holds after every step
//! - Observable state matches the model after every step
//! - Garbage frames never change state

#![no_main]

use arbitrary::Arbitrary;
use arena_harness::{InvariantRegistry, ModelWorld, Operation, SimServer, SystemSnapshot};
use arena_server::ServerEvent;
use libfuzzer_sys::fuzz_target;

const NUM_CLIENTS: usize = 6;

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Op(Operation),
    Garbage { client_id: u8, text: String },
}

fuzz_target!(|steps: Vec<Step>| {
    let mut model = ModelWorld::new(NUM_CLIENTS);
    let mut real = SimServer::new(NUM_CLIENTS);
    let invariants = InvariantRegistry::standard();

    for step in steps.iter().take(256) {
        match step {
            Step::Op(op) => {
                let model_result = model.apply(op);
                let real_result = real.apply(op).expect("driver rejected consistent input");
                assert_eq!(model_result, real_result, "result divergence on {op:?}");
            }
            Step::Garbage { client_id, text } => {
                let Some(session_id) = real.session_of(*client_id) else {
                    continue;
                };
                if arena_proto::ClientEvent::decode(text).is_ok() {
                    continue;
                }

                let before = real.observable_state();
                real.inject(ServerEvent::FrameReceived { session_id, text: text.clone() })
                    .expect("driver rejected frame for live session");
                assert_eq!(before, real.observable_state(), "garbage frame changed state");
            }
        }

        assert_eq!(model.observable_state(), real.observable_state(), "model divergence");

        if let Err(violations) = invariants.check_all(&SystemSnapshot::from_driver(real.driver())) {
            panic!("invariant violations: {violations:?}");
        }
    }
});
