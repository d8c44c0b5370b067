//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the driver's state at a point in time. Invariants operate
//! on snapshots rather than live state to ensure consistent, atomic checks.

use std::collections::{BTreeMap, BTreeSet};

use arena_server::ServerDriver;

/// Snapshot of the whole coordinator.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Live rooms by room ID.
    pub rooms: BTreeMap<String, RoomSnapshot>,
    /// Reverse index: identity → rooms it has joined.
    pub identity_rooms: BTreeMap<String, BTreeSet<String>>,
    /// Registered sessions by session ID.
    pub sessions: BTreeMap<u64, SessionSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the state of a driver.
    pub fn from_driver(driver: &ServerDriver) -> Self {
        let rooms = driver
            .rooms()
            .rooms()
            .map(|(room_id, room)| {
                (room_id.to_string(), RoomSnapshot {
                    members: room.members().iter().cloned().collect(),
                    language: room.language().to_string(),
                })
            })
            .collect();

        let identity_rooms = driver
            .rooms()
            .identities()
            .map(|identity| {
                let rooms: BTreeSet<String> =
                    driver.rooms().rooms_of(identity).map(str::to_string).collect();
                (identity.to_string(), rooms)
            })
            .collect();

        let sessions = driver
            .registry()
            .sessions()
            .map(|(session_id, info)| {
                let rooms =
                    driver.registry().rooms_for_session(session_id).map(str::to_string).collect();
                (session_id, SessionSnapshot { identity: info.identity.clone(), rooms })
            })
            .collect();

        Self { rooms, identity_rooms, sessions }
    }

    /// Add a room.
    pub fn with_room(mut self, room_id: &str, room: RoomSnapshot) -> Self {
        self.rooms.insert(room_id.to_string(), room);
        self
    }

    /// Add a session.
    pub fn with_session(mut self, session_id: u64, session: SessionSnapshot) -> Self {
        self.sessions.insert(session_id, session);
        self
    }
}

/// Snapshot of one room.
#[derive(Debug, Clone, Default)]
pub struct RoomSnapshot {
    /// Identities in the room.
    pub members: BTreeSet<String>,
    /// Current language.
    pub language: String,
}

impl RoomSnapshot {
    /// Room with the given members and language.
    pub fn new<'a>(members: impl IntoIterator<Item = &'a str>, language: &str) -> Self {
        Self {
            members: members.into_iter().map(str::to_string).collect(),
            language: language.to_string(),
        }
    }
}

/// Snapshot of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Resolved identity. `None` for inert sessions.
    pub identity: Option<String>,
    /// Rooms the session is subscribed to.
    pub rooms: BTreeSet<String>,
}
