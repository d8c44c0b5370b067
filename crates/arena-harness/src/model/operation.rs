//! Operations for model-based testing.
//!
//! Operations represent all possible actions in the system. They are generated
//! randomly by proptest (or libFuzzer) and applied to both the model and the
//! real driver.

use arbitrary::Arbitrary;
use serde_json::{Map, Value};

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Room identifier (uses u8 to keep test space manageable).
pub type ModelRoomId = u8;

/// Clients whose IDs are congruent modulo this share an identity, so that
/// client 0 and client 3 both connect as `user0`.
pub const IDENTITY_POOL: u8 = 3;

/// Identity a client connects with.
pub fn identity_for(client_id: ClientId) -> String {
    format!("user{}", client_id % IDENTITY_POOL)
}

/// Wire room ID for a model room. Zero-padded so wire order matches numeric
/// order.
pub fn room_name(room_id: ModelRoomId) -> String {
    format!("room-{room_id:03}")
}

/// Operations that can be applied to the system.
///
/// Each operation targets a specific client. Operations on a client that is
/// not connected fail with [`OperationError::NotConnected`] on both sides.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client opens a connection.
    Connect {
        /// Client connecting.
        client_id: ClientId,
    },

    /// Client joins a room.
    Join {
        /// Client joining.
        client_id: ClientId,
        /// Room to join.
        room_id: ModelRoomId,
    },

    /// Client leaves a room.
    Leave {
        /// Client leaving.
        client_id: ClientId,
        /// Room to leave.
        room_id: ModelRoomId,
    },

    /// Client changes a room's language.
    SetLanguage {
        /// Client performing the change.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
        /// New language.
        language: ModelLanguage,
    },

    /// Client relays a buffer update.
    CodeUpdate {
        /// Client sending the update.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
        /// Buffer revision, expanded into the payload.
        revision: u8,
    },

    /// Client sends a chat line.
    SendMessage {
        /// Client sending.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
        /// Message seed, expanded into the body.
        seed: u8,
    },

    /// Client's connection drops without any leave.
    Disconnect {
        /// Client disconnecting.
        client_id: ClientId,
    },
}

impl Operation {
    /// Client this operation is performed by.
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Connect { client_id }
            | Self::Join { client_id, .. }
            | Self::Leave { client_id, .. }
            | Self::SetLanguage { client_id, .. }
            | Self::CodeUpdate { client_id, .. }
            | Self::SendMessage { client_id, .. }
            | Self::Disconnect { client_id } => *client_id,
        }
    }
}

/// Languages a room can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelLanguage {
    /// `javascript`
    JavaScript,
    /// `python`
    Python,
    /// `rust`
    Rust,
    /// `go`
    Go,
}

impl ModelLanguage {
    /// Wire language tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
        }
    }
}

/// Code-update payload for a revision, `roomId` included.
pub fn code_payload(room_id: ModelRoomId, revision: u8) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("roomId".to_string(), Value::from(room_name(room_id)));
    payload.insert("code".to_string(), Value::from(format!("// revision {revision}")));
    payload.insert("revision".to_string(), Value::from(revision));
    payload
}

/// Chat body for a seed. Seed 0 is the empty message.
pub fn chat_body(seed: u8) -> String {
    "ab".repeat(usize::from(seed % 4))
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation was delivered.
    Ok,

    /// Operation was refused before reaching the server.
    Error(OperationError),
}

impl OperationResult {
    /// Whether the operation was delivered.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Reasons an operation cannot be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Client ID outside the world.
    InvalidClient,

    /// Client has no open connection.
    NotConnected,

    /// Client is already connected.
    AlreadyConnected,
}
