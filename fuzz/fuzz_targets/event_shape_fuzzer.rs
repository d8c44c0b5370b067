//! Fuzz target for structured-but-hostile event envelopes
//!
//! Random bytes rarely get past the JSON parser. This target builds
//! well-formed envelopes whose fields are missing, mistyped, or oversized.
//!
//! # Strategy
//!
//! - Known names: every wire event name plus near misses
//! - Wrong types: `data` as an array, string, number, or null
//! - Field confusion: `roomId`, `language` and `message` with non-string values
//! - Extra keys: unrelated keys alongside the real ones
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Non-object `data` is always rejected
//! - A decoded event reports the `roomId` it was given

#![no_main]

use arbitrary::Arbitrary;
use arena_proto::ClientEvent;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

const NAMES: [&str; 7] = [
    "join-room",
    "set-language",
    "code-update",
    "send-message",
    "leave-room",
    "join_room",
    "",
];

#[derive(Debug, Clone, Arbitrary)]
struct Envelope {
    name: u8,
    data: DataShape,
}

#[derive(Debug, Clone, Arbitrary)]
enum DataShape {
    Object(Vec<(FieldName, FieldValue)>),
    Array,
    Text(String),
    Number(i64),
    Null,
}

#[derive(Debug, Clone, Arbitrary)]
enum FieldName {
    RoomId,
    Language,
    Message,
    Code,
    Other(String),
}

#[derive(Debug, Clone, Arbitrary)]
enum FieldValue {
    Text(String),
    Number(i64),
    Bool(bool),
    Nested(Vec<String>),
    Null,
}

impl FieldName {
    fn key(&self) -> String {
        match self {
            Self::RoomId => "roomId".to_string(),
            Self::Language => "language".to_string(),
            Self::Message => "message".to_string(),
            Self::Code => "code".to_string(),
            Self::Other(key) => key.clone(),
        }
    }
}

impl FieldValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::from(s.as_str()),
            Self::Number(n) => Value::from(*n),
            Self::Bool(b) => Value::from(*b),
            Self::Nested(items) => json!(items),
            Self::Null => Value::Null,
        }
    }
}

fuzz_target!(|envelope: Envelope| {
    let name = NAMES[usize::from(envelope.name) % NAMES.len()];

    let (data, is_object) = match &envelope.data {
        DataShape::Object(fields) => {
            let map: Map<String, Value> =
                fields.iter().map(|(k, v)| (k.key(), v.to_json())).collect();
            (Value::Object(map), true)
        }
        DataShape::Array => (json!([]), false),
        DataShape::Text(s) => (Value::from(s.as_str()), false),
        DataShape::Number(n) => (Value::from(*n), false),
        DataShape::Null => (Value::Null, false),
    };

    let expected_room = data.get("roomId").and_then(Value::as_str).map(str::to_string);
    let result = ClientEvent::from_parts(name, data);

    if !is_object && NAMES[..5].contains(&name) {
        assert!(result.is_err(), "non-object data accepted for {name}");
    }

    if let Ok(event) = result {
        assert_eq!(Some(event.room_id().to_string()), expected_room);
    }
});
