//! Simulated runtime around the real driver.
//!
//! Plays the part of the WebSocket runtime without any sockets: it assigns
//! session IDs, encodes client events into text frames, feeds them to
//! [`ServerDriver`], and delivers the resulting actions into per-client
//! inboxes the same way the production runtime fans them out.

use std::collections::{BTreeMap, HashMap};

use arena_proto::{ClientEvent, Handshake, ServerMessage};
use arena_server::{
    DriverConfig, DriverError, LogLevel, ServerAction, ServerDriver, ServerEvent,
};

use crate::model::{
    ClientId, ObservableState, Operation, OperationError, OperationResult, chat_body,
    code_payload, identity_for, room_name,
};

/// Real driver plus the bookkeeping a runtime would do.
pub struct SimServer {
    driver: ServerDriver,
    /// Connected clients → current session ID
    sessions: BTreeMap<ClientId, u64>,
    /// Session ID → client, for routing outbound messages
    clients: HashMap<u64, ClientId>,
    next_session_id: u64,
    inboxes: Vec<Vec<ServerMessage>>,
}

impl SimServer {
    /// Create a simulated server for `num_clients` clients.
    pub fn new(num_clients: usize) -> Self {
        Self::with_config(num_clients, DriverConfig::default())
    }

    /// Create a simulated server with a specific driver configuration.
    pub fn with_config(num_clients: usize, config: DriverConfig) -> Self {
        Self {
            driver: ServerDriver::new(config),
            sessions: BTreeMap::new(),
            clients: HashMap::new(),
            next_session_id: 1,
            inboxes: vec![Vec::new(); num_clients],
        }
    }

    /// The driver under test.
    pub fn driver(&self) -> &ServerDriver {
        &self.driver
    }

    /// Current session of a connected client.
    pub fn session_of(&self, client_id: ClientId) -> Option<u64> {
        self.sessions.get(&client_id).copied()
    }

    /// Apply an operation through the driver.
    ///
    /// A `DriverError` here means the driver's bookkeeping disagrees with the
    /// runtime's, which is always a bug.
    pub fn apply(&mut self, op: &Operation) -> Result<OperationResult, DriverError> {
        let client_id = op.client_id();
        if usize::from(client_id) >= self.inboxes.len() {
            return Ok(OperationResult::Error(OperationError::InvalidClient));
        }

        if let Operation::Connect { .. } = op {
            if self.sessions.contains_key(&client_id) {
                return Ok(OperationResult::Error(OperationError::AlreadyConnected));
            }
            self.connect(client_id)?;
            return Ok(OperationResult::Ok);
        }

        let Some(session_id) = self.session_of(client_id) else {
            return Ok(OperationResult::Error(OperationError::NotConnected));
        };

        let event = match op {
            Operation::Connect { .. } => return Ok(OperationResult::Ok),
            Operation::Disconnect { .. } => {
                self.disconnect(client_id, session_id)?;
                return Ok(OperationResult::Ok);
            },
            Operation::Join { room_id, .. } => ClientEvent::JoinRoom { room_id: room_name(*room_id) },
            Operation::Leave { room_id, .. } => {
                ClientEvent::LeaveRoom { room_id: room_name(*room_id) }
            },
            Operation::SetLanguage { room_id, language, .. } => ClientEvent::SetLanguage {
                room_id: room_name(*room_id),
                language: language.as_str().to_string(),
            },
            Operation::CodeUpdate { room_id, revision, .. } => ClientEvent::CodeUpdate {
                room_id: room_name(*room_id),
                payload: code_payload(*room_id, *revision),
            },
            Operation::SendMessage { room_id, seed, .. } => ClientEvent::SendMessage {
                room_id: room_name(*room_id),
                message: chat_body(*seed),
            },
        };

        // Route through the text decoder, as the runtime does. Encoding a
        // well-formed event cannot fail; fall back to the decoded path if it
        // ever does.
        let server_event = match event.encode() {
            Ok(text) => ServerEvent::FrameReceived { session_id, text },
            Err(_) => ServerEvent::EventReceived { session_id, event },
        };
        let actions = self.driver.process_event(server_event)?;
        self.execute(actions);

        Ok(OperationResult::Ok)
    }

    /// Feed a raw event to the driver and deliver whatever it produces.
    ///
    /// Lets callers exercise paths the operation vocabulary can't reach, such
    /// as undecodable frames.
    pub fn inject(&mut self, event: ServerEvent) -> Result<(), DriverError> {
        let actions = self.driver.process_event(event)?;
        self.execute(actions);
        Ok(())
    }

    fn connect(&mut self, client_id: ClientId) -> Result<(), DriverError> {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let actions = self.driver.process_event(ServerEvent::ConnectionAccepted {
            session_id,
            handshake: Handshake::with_identity(identity_for(client_id)),
        })?;

        self.sessions.insert(client_id, session_id);
        self.clients.insert(session_id, client_id);
        self.execute(actions);
        Ok(())
    }

    fn disconnect(&mut self, client_id: ClientId, session_id: u64) -> Result<(), DriverError> {
        self.sessions.remove(&client_id);
        self.clients.remove(&session_id);

        let actions = self.driver.process_event(ServerEvent::ConnectionClosed {
            session_id,
            reason: "simulated disconnect".to_string(),
        })?;
        self.execute(actions);
        Ok(())
    }

    /// Execute actions the way the production runtime does.
    fn execute(&mut self, actions: Vec<ServerAction>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, message } => {
                    self.deliver(session_id, message);
                },
                ServerAction::BroadcastToRoom { room_id, message, exclude_session } => {
                    let sessions: Vec<u64> = self
                        .driver
                        .sessions_in_room(&room_id)
                        .filter(|s| Some(*s) != exclude_session)
                        .collect();
                    for session_id in sessions {
                        self.deliver(session_id, message.clone());
                    }
                },
                ServerAction::CloseConnection { session_id, reason } => {
                    tracing::debug!("closing simulated session {}: {}", session_id, reason);
                    if let Some(client_id) = self.clients.remove(&session_id) {
                        self.sessions.remove(&client_id);
                    }
                },
                ServerAction::Log { level, message } => match level {
                    LogLevel::Debug | LogLevel::Info => tracing::trace!("{}", message),
                    LogLevel::Warn | LogLevel::Error => tracing::debug!("{}", message),
                },
            }
        }
    }

    fn deliver(&mut self, session_id: u64, message: ServerMessage) {
        if let Some(client_id) = self.clients.get(&session_id) {
            self.inboxes[usize::from(*client_id)].push(message);
        }
    }

    /// Extract observable state for comparison with the model.
    pub fn observable_state(&self) -> ObservableState {
        let mut rooms: Vec<(String, Vec<String>, String)> = self
            .driver
            .rooms()
            .rooms()
            .map(|(room_id, room)| {
                let members = room.member_list().iter().map(str::to_string).collect();
                (room_id.to_string(), members, room.language().to_string())
            })
            .collect();
        rooms.sort();

        let client_rooms = (0..self.inboxes.len())
            .map(|i| {
                let Some(session_id) = self.session_of(i as ClientId) else {
                    return Vec::new();
                };
                let mut subscribed: Vec<String> = self
                    .driver
                    .registry()
                    .rooms_for_session(session_id)
                    .map(str::to_string)
                    .collect();
                subscribed.sort();
                subscribed
            })
            .collect();

        ObservableState { rooms, client_rooms, inboxes: self.inboxes.clone() }
    }
}
