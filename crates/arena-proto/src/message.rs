//! Outbound server messages.
//!
//! Serialized with the same envelope as inbound events, using serde's
//! adjacent tagging: `{"event": "active-users", "data": ["alice", "bob"]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    Identity,
    errors::{ProtocolError, Result},
};

/// A chat line relayed to the other members of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identity of the sender, as resolved at handshake
    pub username: Identity,
    /// Message body
    pub message: String,
}

/// A message sent by the coordinator to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Current language of a room
    RoomLanguage(String),

    /// Full-replace snapshot of a room's members. Order carries no meaning.
    ActiveUsers(Vec<Identity>),

    /// Buffer update from another member, exactly as that member sent it
    UpdateCode(Map<String, Value>),

    /// Chat line from another member
    ReceiveMessage(ChatMessage),
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn room_language_wire_format() {
        let text = ServerMessage::RoomLanguage("python".to_string()).encode().unwrap();
        insta::assert_snapshot!(text, @r#"{"event":"room-language","data":"python"}"#);
    }

    #[test]
    fn active_users_wire_format() {
        let text = ServerMessage::ActiveUsers(vec!["alice".to_string(), "bob".to_string()])
            .encode()
            .unwrap();
        insta::assert_snapshot!(text, @r#"{"event":"active-users","data":["alice","bob"]}"#);
    }

    #[test]
    fn receive_message_wire_format() {
        let text = ServerMessage::ReceiveMessage(ChatMessage {
            username: "alice".to_string(),
            message: "hi".to_string(),
        })
        .encode()
        .unwrap();
        insta::assert_snapshot!(text, @r#"{"event":"receive-message","data":{"username":"alice","message":"hi"}}"#);
    }

    #[test]
    fn update_code_relays_payload_untouched() {
        let Value::Object(payload) = json!({ "roomId": "abc", "code": "print(1)", "rev": 3 }) else {
            panic!("expected object");
        };

        let text = ServerMessage::UpdateCode(payload.clone()).encode().unwrap();
        let decoded = ServerMessage::decode(&text).unwrap();
        assert_eq!(decoded, ServerMessage::UpdateCode(payload));
    }
}
