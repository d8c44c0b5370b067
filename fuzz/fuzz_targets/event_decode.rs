//! Fuzz target for ClientEvent::decode
//!
//! This fuzzer feeds arbitrary text frames to the event decoder to find:
//! - Parser crashes or panics
//! - Envelopes that decode but cannot be re-encoded
//! - Events that change meaning across an encode/decode cycle
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use arena_proto::ClientEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(event) = ClientEvent::decode(text) else {
        return;
    };

    let encoded = event.encode().expect("decoded event must re-encode");
    let decoded = ClientEvent::decode(&encoded).expect("re-encoded event must decode");
    assert_eq!(event, decoded, "event changed across encode/decode");
});
