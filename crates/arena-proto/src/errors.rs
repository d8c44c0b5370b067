//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding wire messages.
///
/// None of these are fatal for a connection. The coordinator drops the
/// offending event, logs the error, and keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not valid JSON or lacks the `event` envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Envelope names an event this protocol does not define.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload is present but is not a JSON object.
    #[error("invalid payload for {event}: expected an object")]
    PayloadNotObject {
        /// Event whose payload was rejected
        event: &'static str,
    },

    /// A field the event requires is absent, empty, or not a string.
    #[error("missing field {field} in {event}")]
    MissingField {
        /// Event whose payload was rejected
        event: &'static str,
        /// Name of the missing field as it appears on the wire
        field: &'static str,
    },

    /// Outbound message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}
