//! Connection registry for session and room subscription tracking.
//!
//! The registry maintains bidirectional mappings: room → sessions (for
//! broadcast) and session → rooms (for cleanup on disconnect). A third index,
//! identity → sessions, answers whether a departing session was the last one
//! holding its identity in a room.
//!
//! This is session-level bookkeeping only. Which identities are *members* of a
//! room is the [`RoomRegistry`](crate::RoomRegistry)'s business.

use std::collections::{HashMap, HashSet};

use arena_proto::{Identity, RoomId};

/// Information about a registered session.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    /// Identity resolved at handshake. `None` marks an inert session.
    pub identity: Option<Identity>,
    /// Room hint supplied at handshake. Logged on accept; never auto-joins.
    pub room_hint: Option<RoomId>,
}

impl SessionInfo {
    /// Session without an identity. It takes part in nothing.
    pub fn inert() -> Self {
        Self::default()
    }

    /// Session with a resolved identity.
    pub fn identified(identity: impl Into<Identity>) -> Self {
        Self { identity: Some(identity.into()), room_hint: None }
    }

    /// Attach the handshake room hint.
    pub fn with_room_hint(mut self, room_hint: Option<RoomId>) -> Self {
        self.room_hint = room_hint;
        self
    }
}

/// Registry for tracking sessions and room subscriptions.
///
/// Maintains bidirectional mappings for efficient lookups:
/// - Get all sessions in a room (for broadcast)
/// - Get all rooms a session is in (for cleanup)
/// - Get all sessions sharing an identity (for leave decisions)
///
/// Unlike a login system, several sessions may claim the same identity (a
/// second browser tab, or a reconnect racing the old socket's teardown).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Session ID → session info
    sessions: HashMap<u64, SessionInfo>,
    /// Room ID → set of subscribed session IDs
    room_subscriptions: HashMap<RoomId, HashSet<u64>>,
    /// Session ID → set of subscribed room IDs
    session_rooms: HashMap<u64, HashSet<RoomId>>,
    /// Identity → live session IDs (reverse index)
    identity_sessions: HashMap<Identity, HashSet<u64>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session already exists.
    pub fn register_session(&mut self, session_id: u64, info: SessionInfo) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }

        if let Some(identity) = &info.identity {
            self.identity_sessions.entry(identity.clone()).or_default().insert(session_id);
        }

        self.sessions.insert(session_id, info);
        self.session_rooms.insert(session_id, HashSet::new());
        true
    }

    /// Unregister a session and remove all its room subscriptions.
    ///
    /// Returns the session info if it existed, along with the rooms it was in.
    pub fn unregister_session(
        &mut self,
        session_id: u64,
    ) -> Option<(SessionInfo, HashSet<RoomId>)> {
        let info = self.sessions.remove(&session_id)?;
        let rooms = self.session_rooms.remove(&session_id).unwrap_or_default();

        if let Some(identity) = &info.identity
            && let Some(sessions) = self.identity_sessions.get_mut(identity)
        {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                self.identity_sessions.remove(identity);
            }
        }

        for room_id in &rooms {
            if let Some(subscribers) = self.room_subscriptions.get_mut(room_id) {
                subscribers.remove(&session_id);
                if subscribers.is_empty() {
                    self.room_subscriptions.remove(room_id);
                }
            }
        }

        Some((info, rooms))
    }

    /// Session metadata. `None` if session doesn't exist.
    pub fn session(&self, session_id: u64) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// All registered sessions.
    pub fn sessions(&self) -> impl Iterator<Item = (u64, &SessionInfo)> + '_ {
        self.sessions.iter().map(|(id, info)| (*id, info))
    }

    /// Check if a session is registered.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Subscribe a session to a room.
    ///
    /// Returns `false` if the session is not registered.
    pub fn subscribe(&mut self, session_id: u64, room_id: &str) -> bool {
        if !self.sessions.contains_key(&session_id) {
            return false;
        }

        self.room_subscriptions.entry(room_id.to_string()).or_default().insert(session_id);
        self.session_rooms.entry(session_id).or_default().insert(room_id.to_string());
        true
    }

    /// Unsubscribe a session from a room.
    ///
    /// Returns `true` if the session was subscribed and is now unsubscribed.
    pub fn unsubscribe(&mut self, session_id: u64, room_id: &str) -> bool {
        let removed_from_room =
            self.room_subscriptions.get_mut(room_id).is_some_and(|s| s.remove(&session_id));

        let removed_from_session =
            self.session_rooms.get_mut(&session_id).is_some_and(|r| r.remove(room_id));

        if self.room_subscriptions.get(room_id).is_some_and(HashSet::is_empty) {
            self.room_subscriptions.remove(room_id);
        }

        removed_from_room && removed_from_session
    }

    /// Check if a session is subscribed to a room.
    pub fn is_subscribed(&self, session_id: u64, room_id: &str) -> bool {
        self.room_subscriptions.get(room_id).is_some_and(|s| s.contains(&session_id))
    }

    /// All sessions subscribed to a room.
    pub fn sessions_in_room(&self, room_id: &str) -> impl Iterator<Item = u64> + '_ {
        self.room_subscriptions.get(room_id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// All rooms a session is subscribed to.
    pub fn rooms_for_session(&self, session_id: u64) -> impl Iterator<Item = &str> + '_ {
        self.session_rooms.get(&session_id).into_iter().flat_map(|r| r.iter().map(String::as_str))
    }

    /// All live sessions claiming `identity`.
    pub fn sessions_for_identity(&self, identity: &str) -> impl Iterator<Item = u64> + '_ {
        self.identity_sessions.get(identity).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Whether some session of `identity` other than `session_id` is
    /// subscribed to `room_id`.
    pub fn identity_present_elsewhere(&self, identity: &str, room_id: &str, session_id: u64) -> bool {
        self.sessions_for_identity(identity)
            .any(|other| other != session_id && self.is_subscribed(other, room_id))
    }

    /// Total number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions subscribed to a room.
    pub fn room_session_count(&self, room_id: &str) -> usize {
        self.room_subscriptions.get(room_id).map_or(0, HashSet::len)
    }
}
