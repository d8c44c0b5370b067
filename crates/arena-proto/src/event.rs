//! Inbound client events.
//!
//! Every event carries a `roomId`; the coordinator needs nothing else to
//! route it. `code-update` payloads are kept whole so they can be relayed
//! verbatim.
//!
//! # Invariants
//!
//! - A decoded event always has a non-empty `room_id`. Events without one are
//!   rejected here, so the router never sees a half-formed event.
//! - `CodeUpdate::payload` is the exact object the client sent, `roomId`
//!   included.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    RoomId,
    errors::{ProtocolError, Result},
};

/// Wire name of the join event.
pub const JOIN_ROOM: &str = "join-room";
/// Wire name of the language change event.
pub const SET_LANGUAGE: &str = "set-language";
/// Wire name of the buffer relay event.
pub const CODE_UPDATE: &str = "code-update";
/// Wire name of the chat relay event.
pub const SEND_MESSAGE: &str = "send-message";
/// Wire name of the leave event.
pub const LEAVE_ROOM: &str = "leave-room";

/// JSON envelope shared by every frame.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// An event sent by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Join (and implicitly create) a room
    JoinRoom {
        /// Room to join
        room_id: RoomId,
    },

    /// Change the room's language tag
    SetLanguage {
        /// Target room
        room_id: RoomId,
        /// New language tag
        language: String,
    },

    /// Relay a buffer update to the other members
    CodeUpdate {
        /// Target room
        room_id: RoomId,
        /// Full inbound payload, relayed untouched
        payload: Map<String, Value>,
    },

    /// Relay a chat message to the other members
    SendMessage {
        /// Target room
        room_id: RoomId,
        /// Message body
        message: String,
    },

    /// Leave a room
    LeaveRoom {
        /// Room to leave
        room_id: RoomId,
    },
}

impl ClientEvent {
    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

        Self::from_parts(&envelope.event, envelope.data)
    }

    /// Build an event from its wire name and payload.
    pub fn from_parts(event: &str, data: Value) -> Result<Self> {
        match event {
            JOIN_ROOM => {
                let payload = object(JOIN_ROOM, data)?;
                Ok(Self::JoinRoom { room_id: required_str(JOIN_ROOM, &payload, "roomId")? })
            },
            SET_LANGUAGE => {
                let payload = object(SET_LANGUAGE, data)?;
                Ok(Self::SetLanguage {
                    room_id: required_str(SET_LANGUAGE, &payload, "roomId")?,
                    language: required_str(SET_LANGUAGE, &payload, "language")?,
                })
            },
            CODE_UPDATE => {
                let payload = object(CODE_UPDATE, data)?;
                let room_id = required_str(CODE_UPDATE, &payload, "roomId")?;
                Ok(Self::CodeUpdate { room_id, payload })
            },
            SEND_MESSAGE => {
                let payload = object(SEND_MESSAGE, data)?;
                let room_id = required_str(SEND_MESSAGE, &payload, "roomId")?;
                // An empty chat line is still a message.
                let message = match payload.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => {
                        return Err(ProtocolError::MissingField {
                            event: SEND_MESSAGE,
                            field: "message",
                        });
                    },
                };
                Ok(Self::SendMessage { room_id, message })
            },
            LEAVE_ROOM => {
                let payload = object(LEAVE_ROOM, data)?;
                Ok(Self::LeaveRoom { room_id: required_str(LEAVE_ROOM, &payload, "roomId")? })
            },
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        let data = match self {
            Self::JoinRoom { room_id } | Self::LeaveRoom { room_id } => {
                json!({ "roomId": room_id })
            },
            Self::SetLanguage { room_id, language } => {
                json!({ "roomId": room_id, "language": language })
            },
            Self::CodeUpdate { room_id, payload } => {
                let mut payload = payload.clone();
                payload.insert("roomId".to_string(), Value::String(room_id.clone()));
                Value::Object(payload)
            },
            Self::SendMessage { room_id, message } => {
                json!({ "roomId": room_id, "message": message })
            },
        };

        serde_json::to_string(&json!({ "event": self.name(), "data": data }))
            .map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => JOIN_ROOM,
            Self::SetLanguage { .. } => SET_LANGUAGE,
            Self::CodeUpdate { .. } => CODE_UPDATE,
            Self::SendMessage { .. } => SEND_MESSAGE,
            Self::LeaveRoom { .. } => LEAVE_ROOM,
        }
    }

    /// Room this event targets.
    pub fn room_id(&self) -> &str {
        match self {
            Self::JoinRoom { room_id }
            | Self::SetLanguage { room_id, .. }
            | Self::CodeUpdate { room_id, .. }
            | Self::SendMessage { room_id, .. }
            | Self::LeaveRoom { room_id } => room_id,
        }
    }
}

fn object(event: &'static str, data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(ProtocolError::PayloadNotObject { event }),
    }
}

fn required_str(event: &'static str, payload: &Map<String, Value>, field: &'static str) -> Result<String> {
    match payload.get(field) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ProtocolError::MissingField { event, field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_join_room() {
        let event = ClientEvent::decode(r#"{"event":"join-room","data":{"roomId":"abc"}}"#).unwrap();
        assert_eq!(event, ClientEvent::JoinRoom { room_id: "abc".to_string() });
    }

    #[test]
    fn decode_set_language() {
        let event = ClientEvent::decode(
            r#"{"event":"set-language","data":{"roomId":"abc","language":"python"}}"#,
        )
        .unwrap();
        assert_eq!(event, ClientEvent::SetLanguage {
            room_id: "abc".to_string(),
            language: "python".to_string(),
        });
    }

    #[test]
    fn code_update_keeps_extra_fields() {
        let event = ClientEvent::decode(
            r#"{"event":"code-update","data":{"roomId":"abc","code":"let x = 1;","cursor":7}}"#,
        )
        .unwrap();

        let ClientEvent::CodeUpdate { room_id, payload } = event else {
            panic!("expected CodeUpdate");
        };
        assert_eq!(room_id, "abc");
        assert_eq!(payload.get("code"), Some(&json!("let x = 1;")));
        assert_eq!(payload.get("cursor"), Some(&json!(7)));
        assert_eq!(payload.get("roomId"), Some(&json!("abc")));
    }

    #[test]
    fn send_message_allows_empty_body() {
        let event = ClientEvent::decode(
            r#"{"event":"send-message","data":{"roomId":"abc","message":""}}"#,
        )
        .unwrap();
        assert_eq!(event, ClientEvent::SendMessage {
            room_id: "abc".to_string(),
            message: String::new(),
        });
    }

    #[test]
    fn missing_room_id_is_rejected() {
        let err = ClientEvent::decode(r#"{"event":"leave-room","data":{}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::MissingField { event: LEAVE_ROOM, field: "roomId" });

        let err = ClientEvent::decode(r#"{"event":"join-room","data":{"roomId":""}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::MissingField { event: JOIN_ROOM, field: "roomId" });

        let err = ClientEvent::decode(r#"{"event":"join-room","data":{"roomId":42}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::MissingField { event: JOIN_ROOM, field: "roomId" });
    }

    #[test]
    fn empty_language_is_rejected() {
        let err = ClientEvent::decode(
            r#"{"event":"set-language","data":{"roomId":"abc","language":""}}"#,
        )
        .unwrap_err();
        assert_eq!(err, ProtocolError::MissingField { event: SET_LANGUAGE, field: "language" });
    }

    #[test]
    fn missing_data_is_not_an_object() {
        let err = ClientEvent::decode(r#"{"event":"join-room"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::PayloadNotObject { event: JOIN_ROOM });
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = ClientEvent::decode(r#"{"event":"run-code","data":{"roomId":"abc"}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEvent("run-code".to_string()));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = ClientEvent::decode("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn encode_then_decode_preserves_event() {
        let event = ClientEvent::SetLanguage {
            room_id: "Room-1".to_string(),
            language: "cpp".to_string(),
        };
        let text = event.encode().unwrap();
        assert_eq!(ClientEvent::decode(&text).unwrap(), event);
    }
}
