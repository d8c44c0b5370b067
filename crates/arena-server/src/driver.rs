//! Server driver.
//!
//! Ties together the connection gateway, the RoomRegistry (membership and
//! language) and the ConnectionRegistry (session-to-room mapping). The driver
//! performs no I/O: the runtime feeds it [`ServerEvent`]s and executes the
//! [`ServerAction`]s it returns.

use arena_proto::{ChatMessage, ClientEvent, Handshake, ProtocolError, RoomId, ServerMessage};
use serde_json::{Map, Value};

use crate::{
    gateway,
    registry::{ConnectionRegistry, SessionInfo},
    rooms::{DEFAULT_LANGUAGE, Removal, RoomRegistry},
    server_error::DriverError,
};

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Language given to newly created rooms
    pub default_language: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_connections: 10_000, default_language: DEFAULT_LANGUAGE.to_string() }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (production or test harness).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection completed its WebSocket handshake
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: u64,
        /// Parameters from the upgrade request
        handshake: Handshake,
    },

    /// A raw text frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        session_id: u64,
        /// Undecoded frame body
        text: String,
    },

    /// An already-decoded event was received from a connection
    EventReceived {
        /// Connection that sent the event
        session_id: u64,
        /// The decoded event
        event: ClientEvent,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerAction {
    /// Send a message to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Message to send
        message: ServerMessage,
    },

    /// Broadcast a message to all sessions subscribed to a room
    BroadcastToRoom {
        /// Target room ID
        room_id: RoomId,
        /// Message to broadcast
        message: ServerMessage,
        /// Optional session to exclude from broadcast
        exclude_session: Option<u64>,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

impl ServerAction {
    pub(crate) fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log { level, message: message.into() }
    }
}

/// Action-based server driver.
///
/// Orchestrates session admission, room membership and event fan-out.
#[derive(Debug)]
pub struct ServerDriver {
    /// Session/room subscription registry
    pub(crate) registry: ConnectionRegistry,
    /// Room membership and language
    pub(crate) rooms: RoomRegistry,
    /// Driver configuration
    config: DriverConfig,
}

impl Default for ServerDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl ServerDriver {
    /// Create a new server driver.
    pub fn new(config: DriverConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomRegistry::new(config.default_language.clone()),
            config,
        }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver. Participant input
    /// never makes this fail; an `Err` means the runtime itself misbehaved.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id, handshake } => {
                self.handle_connection_accepted(session_id, handshake)
            },
            ServerEvent::FrameReceived { session_id, text } => {
                self.handle_frame_received(session_id, &text)
            },
            ServerEvent::EventReceived { session_id, event } => {
                self.handle_event_received(session_id, event)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.reconcile_disconnect(session_id, &reason))
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
        handshake: Handshake,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.registry.has_session(session_id) {
            return Err(DriverError::SessionAlreadyExists(session_id));
        }

        if self.registry.session_count() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        let hint = handshake.room_id.as_deref().unwrap_or("-").to_string();
        let (info, log) = match gateway::accept(session_id, &handshake) {
            Ok(conn) => {
                let log = ServerAction::log(
                    LogLevel::Debug,
                    format!(
                        "connection {} accepted as '{}' (room hint {})",
                        session_id, conn.identity, hint
                    ),
                );
                (SessionInfo::from(conn), log)
            },
            Err(e) => {
                let log = ServerAction::log(
                    LogLevel::Warn,
                    format!("{}; session is inert (room hint {})", e, hint),
                );
                (SessionInfo::inert().with_room_hint(handshake.room_id), log)
            },
        };

        self.registry.register_session(session_id, info);

        Ok(vec![log])
    }

    /// Decode a raw frame and dispatch it.
    fn handle_frame_received(
        &mut self,
        session_id: u64,
        text: &str,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.identity_of(session_id)?.is_none() {
            return Ok(vec![ServerAction::log(
                LogLevel::Debug,
                format!("dropping frame from inert session {}", session_id),
            )]);
        }

        match ClientEvent::decode(text) {
            Ok(event) => self.handle_event_received(session_id, event),
            Err(ProtocolError::UnknownEvent(name)) => Ok(vec![ServerAction::log(
                LogLevel::Debug,
                format!("dropping unknown event '{}' from session {}", name, session_id),
            )]),
            Err(e) => Ok(vec![ServerAction::log(
                LogLevel::Warn,
                format!("dropping malformed frame from session {}: {}", session_id, e),
            )]),
        }
    }

    /// Route a decoded event.
    fn handle_event_received(
        &mut self,
        session_id: u64,
        event: ClientEvent,
    ) -> Result<Vec<ServerAction>, DriverError> {
        let Some(identity) = self.identity_of(session_id)? else {
            return Ok(vec![ServerAction::log(
                LogLevel::Debug,
                format!("dropping {} from inert session {}", event.name(), session_id),
            )]);
        };

        let actions = match event {
            ClientEvent::JoinRoom { room_id } => self.handle_join(session_id, &identity, room_id),
            ClientEvent::SetLanguage { room_id, language } => {
                self.handle_set_language(room_id, language)
            },
            ClientEvent::CodeUpdate { room_id, payload } => {
                Self::handle_code_update(session_id, room_id, payload)
            },
            ClientEvent::SendMessage { room_id, message } => {
                Self::handle_send_message(session_id, identity, room_id, message)
            },
            ClientEvent::LeaveRoom { room_id } => self.handle_leave(session_id, &identity, &room_id),
        };

        Ok(actions)
    }

    /// Subscribe the session and add its identity to the room.
    fn handle_join(&mut self, session_id: u64, identity: &str, room_id: RoomId) -> Vec<ServerAction> {
        self.registry.subscribe(session_id, &room_id);
        let members = self.rooms.add_member(&room_id, identity);
        let language =
            self.rooms.language(&room_id).unwrap_or(self.rooms.default_language()).to_string();

        vec![
            ServerAction::log(
                LogLevel::Info,
                format!(
                    "'{}' (session {}) joined room '{}', {} member(s)",
                    identity,
                    session_id,
                    room_id,
                    members.len()
                ),
            ),
            ServerAction::SendToSession { session_id, message: ServerMessage::RoomLanguage(language) },
            ServerAction::BroadcastToRoom {
                room_id,
                message: members.to_message(),
                exclude_session: None,
            },
        ]
    }

    /// Last write wins. Unknown rooms are ignored.
    fn handle_set_language(&mut self, room_id: RoomId, language: String) -> Vec<ServerAction> {
        if !self.rooms.set_language(&room_id, &language) {
            return vec![ServerAction::log(
                LogLevel::Debug,
                format!("set-language for unknown room '{}' ignored", room_id),
            )];
        }

        vec![ServerAction::BroadcastToRoom {
            room_id,
            message: ServerMessage::RoomLanguage(language),
            exclude_session: None,
        }]
    }

    fn handle_code_update(
        session_id: u64,
        room_id: RoomId,
        payload: Map<String, Value>,
    ) -> Vec<ServerAction> {
        vec![ServerAction::BroadcastToRoom {
            room_id,
            message: ServerMessage::UpdateCode(payload),
            exclude_session: Some(session_id),
        }]
    }

    fn handle_send_message(
        session_id: u64,
        username: String,
        room_id: RoomId,
        message: String,
    ) -> Vec<ServerAction> {
        vec![ServerAction::BroadcastToRoom {
            room_id,
            message: ServerMessage::ReceiveMessage(ChatMessage { username, message }),
            exclude_session: Some(session_id),
        }]
    }

    /// Unsubscribe the session, then drop the identity from the room unless
    /// one of its other sessions is still there.
    fn handle_leave(&mut self, session_id: u64, identity: &str, room_id: &str) -> Vec<ServerAction> {
        self.registry.unsubscribe(session_id, room_id);

        if self.registry.identity_present_elsewhere(identity, room_id, session_id) {
            return vec![ServerAction::log(
                LogLevel::Debug,
                format!(
                    "session {} left room '{}'; '{}' still present via another session",
                    session_id, room_id, identity
                ),
            )];
        }

        let removal = self.rooms.remove_member(room_id, identity);
        departure_actions(room_id, identity, removal)
    }

    /// Identity of a registered session. `Ok(None)` for inert sessions.
    fn identity_of(&self, session_id: u64) -> Result<Option<String>, DriverError> {
        let info = self.registry.session(session_id).ok_or(DriverError::SessionNotFound(session_id))?;
        Ok(info.identity.clone())
    }

    /// All sessions subscribed to a room.
    pub fn sessions_in_room(&self, room_id: &str) -> impl Iterator<Item = u64> + '_ {
        self.registry.sessions_in_room(room_id)
    }

    /// Room membership and language state.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Session and subscription state.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

/// Actions following an identity's departure from one room.
///
/// A surviving room gets a fresh member list; a deleted room gets nothing,
/// since nobody is left to tell.
pub(crate) fn departure_actions(room_id: &str, identity: &str, removal: Removal) -> Vec<ServerAction> {
    match removal {
        Removal::NotMember => vec![ServerAction::log(
            LogLevel::Debug,
            format!("stale leave of room '{}' by '{}' ignored", room_id, identity),
        )],
        Removal::Remaining(members) => vec![
            ServerAction::log(
                LogLevel::Info,
                format!(
                    "'{}' left room '{}', {} member(s) remain",
                    identity,
                    room_id,
                    members.len()
                ),
            ),
            ServerAction::BroadcastToRoom {
                room_id: room_id.to_string(),
                message: members.to_message(),
                exclude_session: None,
            },
        ],
        Removal::RoomDeleted => vec![ServerAction::log(
            LogLevel::Info,
            format!("'{}' left room '{}', room deleted", identity, room_id),
        )],
    }
}
