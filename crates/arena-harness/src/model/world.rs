//! Model world - the reference room coordinator.
//!
//! A deliberately naive re-statement of the coordinator's behavior: plain
//! ordered maps, linear scans, no reverse indexes. It's the oracle against
//! which the real driver is verified.

use std::collections::{BTreeMap, BTreeSet};

use arena_proto::{ChatMessage, ServerMessage};

use super::operation::{
    ClientId, ModelLanguage, ModelRoomId, Operation, OperationError, OperationResult, chat_body,
    code_payload, identity_for, room_name,
};

/// Language new rooms start with.
const DEFAULT_LANGUAGE: &str = "javascript";

/// Observable state for oracle comparison.
///
/// This is the subset of world state that can be compared against the real
/// implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableState {
    /// Live rooms: `(room, sorted members, language)`, sorted by room.
    pub rooms: Vec<(String, Vec<String>, String)>,
    /// Per-client subscribed rooms (sorted). Empty for disconnected clients.
    pub client_rooms: Vec<Vec<String>>,
    /// Per-client messages received, in delivery order.
    pub inboxes: Vec<Vec<ServerMessage>>,
}

/// A room in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoom {
    /// Identities in the room.
    pub members: BTreeSet<String>,
    /// Current language.
    pub language: String,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    /// Connected clients and the rooms each is subscribed to.
    connected: BTreeMap<ClientId, BTreeSet<ModelRoomId>>,
    /// Live rooms.
    rooms: BTreeMap<ModelRoomId, ModelRoom>,
    /// Messages received per client.
    inboxes: Vec<Vec<ServerMessage>>,
}

impl ModelWorld {
    /// Create a new model world with the given number of clients.
    pub fn new(num_clients: usize) -> Self {
        Self {
            connected: BTreeMap::new(),
            rooms: BTreeMap::new(),
            inboxes: vec![Vec::new(); num_clients],
        }
    }

    /// Number of clients in the world.
    pub fn num_clients(&self) -> usize {
        self.inboxes.len()
    }

    /// Whether a client has an open connection.
    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.connected.contains_key(&client_id)
    }

    /// A live room.
    pub fn room(&self, room_id: ModelRoomId) -> Option<&ModelRoom> {
        self.rooms.get(&room_id)
    }

    /// Apply an operation and return the result.
    ///
    /// This is the main entry point for model-based testing. The result should
    /// match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let client_id = op.client_id();
        if usize::from(client_id) >= self.num_clients() {
            return OperationResult::Error(OperationError::InvalidClient);
        }

        if let Operation::Connect { .. } = op {
            if self.is_connected(client_id) {
                return OperationResult::Error(OperationError::AlreadyConnected);
            }
            self.connected.insert(client_id, BTreeSet::new());
            return OperationResult::Ok;
        }

        if !self.is_connected(client_id) {
            return OperationResult::Error(OperationError::NotConnected);
        }

        match op {
            Operation::Connect { .. } => {},
            Operation::Join { room_id, .. } => self.apply_join(client_id, *room_id),
            Operation::Leave { room_id, .. } => self.apply_leave(client_id, *room_id),
            Operation::SetLanguage { room_id, language, .. } => {
                self.apply_set_language(*room_id, *language);
            },
            Operation::CodeUpdate { room_id, revision, .. } => {
                let message = ServerMessage::UpdateCode(code_payload(*room_id, *revision));
                self.deliver(*room_id, Some(client_id), &message);
            },
            Operation::SendMessage { room_id, seed, .. } => {
                let message = ServerMessage::ReceiveMessage(ChatMessage {
                    username: identity_for(client_id),
                    message: chat_body(*seed),
                });
                self.deliver(*room_id, Some(client_id), &message);
            },
            Operation::Disconnect { .. } => self.apply_disconnect(client_id),
        }

        OperationResult::Ok
    }

    fn apply_join(&mut self, client_id: ClientId, room_id: ModelRoomId) {
        if let Some(rooms) = self.connected.get_mut(&client_id) {
            rooms.insert(room_id);
        }

        let room = self.rooms.entry(room_id).or_insert_with(|| ModelRoom {
            members: BTreeSet::new(),
            language: DEFAULT_LANGUAGE.to_string(),
        });
        room.members.insert(identity_for(client_id));

        let language = ServerMessage::RoomLanguage(room.language.clone());
        let members = ServerMessage::ActiveUsers(room.members.iter().cloned().collect());

        self.inboxes[usize::from(client_id)].push(language);
        self.deliver(room_id, None, &members);
    }

    fn apply_set_language(&mut self, room_id: ModelRoomId, language: ModelLanguage) {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.language = language.as_str().to_string();
        self.deliver(room_id, None, &ServerMessage::RoomLanguage(language.as_str().to_string()));
    }

    fn apply_leave(&mut self, client_id: ClientId, room_id: ModelRoomId) {
        if let Some(rooms) = self.connected.get_mut(&client_id) {
            rooms.remove(&room_id);
        }

        if !self.sibling_in_room(client_id, room_id) {
            self.depart(&identity_for(client_id), room_id);
        }
    }

    fn apply_disconnect(&mut self, client_id: ClientId) {
        let Some(subscribed) = self.connected.remove(&client_id) else {
            return;
        };
        let identity = identity_for(client_id);

        for room_id in subscribed {
            if !self.sibling_in_room(client_id, room_id) {
                self.depart(&identity, room_id);
            }
        }
    }

    /// Whether another connected client with the same identity is
    /// subscribed to the room.
    fn sibling_in_room(&self, client_id: ClientId, room_id: ModelRoomId) -> bool {
        let identity = identity_for(client_id);
        self.connected.iter().any(|(other, rooms)| {
            *other != client_id && identity_for(*other) == identity && rooms.contains(&room_id)
        })
    }

    /// Remove an identity from a room and tell whoever is left.
    fn depart(&mut self, identity: &str, room_id: ModelRoomId) {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if !room.members.remove(identity) {
            return;
        }

        if room.members.is_empty() {
            self.rooms.remove(&room_id);
        } else {
            let members = ServerMessage::ActiveUsers(room.members.iter().cloned().collect());
            self.deliver(room_id, None, &members);
        }
    }

    /// Push a message to every connected client subscribed to the room.
    fn deliver(&mut self, room_id: ModelRoomId, exclude: Option<ClientId>, message: &ServerMessage) {
        for (client_id, rooms) in &self.connected {
            if Some(*client_id) != exclude && rooms.contains(&room_id) {
                self.inboxes[usize::from(*client_id)].push(message.clone());
            }
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let rooms = self
            .rooms
            .iter()
            .map(|(room_id, room)| {
                (room_name(*room_id), room.members.iter().cloned().collect(), room.language.clone())
            })
            .collect();

        let client_rooms = (0..self.num_clients())
            .map(|i| {
                self.connected
                    .get(&(i as ClientId))
                    .map(|rooms| rooms.iter().map(|r| room_name(*r)).collect())
                    .unwrap_or_default()
            })
            .collect();

        ObservableState { rooms, client_rooms, inboxes: self.inboxes.clone() }
    }
}
