//! Connection gateway.
//!
//! Resolves the identity a new connection claims in its handshake. The
//! gateway never rejects at the transport level: a connection without an
//! identity is still registered, but as an inert session that takes part in
//! no room logic.

use arena_proto::{Handshake, Identity, RoomId};
use thiserror::Error;

use crate::registry::SessionInfo;

/// A connection admitted with a resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Runtime-assigned session ID
    pub session_id: u64,
    /// Resolved display identity, immutable for the connection's lifetime
    pub identity: Identity,
    /// Room hint from the handshake
    pub room_hint: Option<RoomId>,
}

impl From<Connection> for SessionInfo {
    fn from(conn: Connection) -> Self {
        SessionInfo::identified(conn.identity).with_room_hint(conn.room_hint)
    }
}

/// Reasons a connection is refused entry to room logic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Handshake carried no identity, or an empty one.
    #[error("connection {session_id} provided no identity")]
    MissingIdentity {
        /// Session that was refused
        session_id: u64,
    },
}

/// Resolve the identity of a new connection.
pub fn accept(session_id: u64, handshake: &Handshake) -> Result<Connection, ConnectionError> {
    let identity = handshake.identity().ok_or(ConnectionError::MissingIdentity { session_id })?;

    Ok(Connection {
        session_id,
        identity: identity.to_string(),
        room_hint: handshake.room_id.clone(),
    })
}
