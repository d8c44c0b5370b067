//! Room registry.
//!
//! Owns every room the process knows about: who is in it and which language
//! it is set to. Rooms are created by the first join and deleted by the last
//! departure. Nothing else creates or deletes them.
//!
//! Alongside the rooms we keep a reverse index, identity → joined rooms, so
//! that purging a departed identity touches only its own rooms instead of
//! scanning the whole map.

use std::collections::{HashMap, HashSet};

use arena_proto::{Identity, RoomId};

use crate::presence::MemberList;

/// Language a room starts with.
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// State of a single room.
#[derive(Debug, Clone)]
pub struct Room {
    /// Identities currently joined
    members: HashSet<Identity>,
    /// Current language tag
    language: String,
}

impl Room {
    fn new(language: String) -> Self {
        Self { members: HashSet::new(), language }
    }

    /// Identities currently joined.
    pub fn members(&self) -> &HashSet<Identity> {
        &self.members
    }

    /// Current language tag.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Presence snapshot of this room.
    pub fn member_list(&self) -> MemberList {
        MemberList::from_members(&self.members)
    }
}

/// Outcome of removing an identity from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The room does not exist or the identity was not in it. Nothing changed.
    NotMember,
    /// The identity left; the room lives on with these members.
    Remaining(MemberList),
    /// The identity was the last member; the room is gone.
    RoomDeleted,
}

impl Removal {
    /// Whether the removal deleted the room.
    pub fn room_deleted(&self) -> bool {
        matches!(self, Self::RoomDeleted)
    }

    /// Members left behind. Empty for a deleted room or a no-op.
    pub fn members(&self) -> MemberList {
        match self {
            Self::Remaining(members) => members.clone(),
            Self::NotMember | Self::RoomDeleted => MemberList::empty(),
        }
    }
}

/// Registry of live rooms.
///
/// # Invariants
///
/// - A room is present iff its member set is non-empty.
/// - `identity_rooms[i]` contains `r` iff `rooms[r].members` contains `i`;
///   identities with no rooms have no entry.
/// - A recreated room starts over with the default language.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Room ID → room state
    rooms: HashMap<RoomId, Room>,
    /// Identity → rooms it has joined (reverse index)
    identity_rooms: HashMap<Identity, HashSet<RoomId>>,
    /// Language applied to newly created rooms
    default_language: String,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl RoomRegistry {
    /// Create an empty registry whose rooms start with `default_language`.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            rooms: HashMap::new(),
            identity_rooms: HashMap::new(),
            default_language: default_language.into(),
        }
    }

    /// Existing room, or a new empty one with the default language.
    ///
    /// Private so that an empty room can never outlive the call that is about
    /// to populate it.
    fn ensure_room(&mut self, room_id: &str) -> &mut Room {
        let language = &self.default_language;
        self.rooms.entry(room_id.to_string()).or_insert_with(|| Room::new(language.clone()))
    }

    /// Add `identity` to `room_id`, creating the room if needed.
    ///
    /// Idempotent: re-adding a present identity changes nothing and still
    /// returns the current member list.
    pub fn add_member(&mut self, room_id: &str, identity: &str) -> MemberList {
        let room = self.ensure_room(room_id);
        room.members.insert(identity.to_string());
        let members = room.member_list();

        self.identity_rooms.entry(identity.to_string()).or_default().insert(room_id.to_string());

        members
    }

    /// Remove `identity` from `room_id`, deleting the room if it empties.
    ///
    /// Unknown rooms and non-members are a silent no-op: clients routinely
    /// send stale leaves for rooms that were already cleaned up.
    pub fn remove_member(&mut self, room_id: &str, identity: &str) -> Removal {
        let removal = Self::detach(&mut self.rooms, room_id, identity);

        if removal != Removal::NotMember
            && let Some(rooms) = self.identity_rooms.get_mut(identity)
        {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.identity_rooms.remove(identity);
            }
        }

        removal
    }

    /// Remove `identity` from every room it has joined.
    ///
    /// Returns one entry per affected room, ordered by room ID. An identity
    /// with no rooms yields an empty list.
    pub fn purge(&mut self, identity: &str) -> Vec<(RoomId, Removal)> {
        let Some(room_ids) = self.identity_rooms.remove(identity) else {
            return Vec::new();
        };

        let mut room_ids: Vec<RoomId> = room_ids.into_iter().collect();
        room_ids.sort();

        room_ids
            .into_iter()
            .map(|room_id| {
                let removal = Self::detach(&mut self.rooms, &room_id, identity);
                (room_id, removal)
            })
            .collect()
    }

    /// Set the language of an existing room.
    ///
    /// Returns `false` without effect if the room does not exist. Never
    /// creates a room.
    pub fn set_language(&mut self, room_id: &str, language: &str) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.language = language.to_string();
                true
            },
            None => false,
        }
    }

    /// Language of a room. `None` if the room does not exist.
    pub fn language(&self, room_id: &str) -> Option<&str> {
        self.rooms.get(room_id).map(Room::language)
    }

    /// Presence snapshot of a room. `None` if the room does not exist.
    pub fn members(&self, room_id: &str) -> Option<MemberList> {
        self.rooms.get(room_id).map(Room::member_list)
    }

    /// Check if a room exists.
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Check if `identity` is a member of `room_id`.
    pub fn is_member(&self, room_id: &str, identity: &str) -> bool {
        self.rooms.get(room_id).is_some_and(|room| room.members.contains(identity))
    }

    /// All rooms `identity` has joined.
    pub fn rooms_of(&self, identity: &str) -> impl Iterator<Item = &str> + '_ {
        self.identity_rooms.get(identity).into_iter().flat_map(|r| r.iter().map(String::as_str))
    }

    /// Identities with at least one joined room.
    pub fn identities(&self) -> impl Iterator<Item = &str> + '_ {
        self.identity_rooms.keys().map(String::as_str)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// All live rooms.
    pub fn rooms(&self) -> impl Iterator<Item = (&str, &Room)> + '_ {
        self.rooms.iter().map(|(room_id, room)| (room_id.as_str(), room))
    }

    /// Language given to newly created rooms.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Remove `identity` from one room without touching the reverse index.
    fn detach(rooms: &mut HashMap<RoomId, Room>, room_id: &str, identity: &str) -> Removal {
        let Some(room) = rooms.get_mut(room_id) else {
            return Removal::NotMember;
        };

        if !room.members.remove(identity) {
            return Removal::NotMember;
        }

        if room.members.is_empty() {
            rooms.remove(room_id);
            Removal::RoomDeleted
        } else {
            Removal::Remaining(room.member_list())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(names: &[&str]) -> MemberList {
        names.iter().copied().collect()
    }

    #[test]
    fn first_join_creates_room_with_default_language() {
        let mut registry = RoomRegistry::default();

        let members = registry.add_member("abc", "alice");

        assert_eq!(members, list(&["alice"]));
        assert!(registry.has_room("abc"));
        assert_eq!(registry.language("abc"), Some("javascript"));
    }

    #[test]
    fn custom_default_language() {
        let mut registry = RoomRegistry::new("python");
        registry.add_member("abc", "alice");
        assert_eq!(registry.language("abc"), Some("python"));
    }

    #[test]
    fn rejoin_is_idempotent() {
        let mut registry = RoomRegistry::default();

        let once = registry.add_member("abc", "alice");
        let twice = registry.add_member("abc", "alice");

        assert_eq!(once, twice);
        assert_eq!(registry.members("abc").unwrap().len(), 1);
        assert_eq!(registry.rooms_of("alice").count(), 1);
    }

    #[test]
    fn room_ids_are_case_sensitive() {
        let mut registry = RoomRegistry::default();

        registry.add_member("abc", "alice");
        registry.add_member("ABC", "bob");

        assert_eq!(registry.room_count(), 2);
        assert_eq!(registry.members("abc").unwrap(), list(&["alice"]));
        assert_eq!(registry.members("ABC").unwrap(), list(&["bob"]));
    }

    #[test]
    fn remove_member_reports_remaining() {
        let mut registry = RoomRegistry::default();
        registry.add_member("abc", "alice");
        registry.add_member("abc", "bob");

        let removal = registry.remove_member("abc", "alice");

        assert_eq!(removal, Removal::Remaining(list(&["bob"])));
        assert!(!removal.room_deleted());
        assert!(!registry.is_member("abc", "alice"));
        assert_eq!(registry.rooms_of("alice").count(), 0);
    }

    #[test]
    fn last_departure_deletes_room() {
        let mut registry = RoomRegistry::default();
        registry.add_member("abc", "alice");
        registry.set_language("abc", "python");

        let removal = registry.remove_member("abc", "alice");

        assert!(removal.room_deleted());
        assert!(removal.members().is_empty());
        assert!(!registry.has_room("abc"));
        assert_eq!(registry.language("abc"), None);
    }

    #[test]
    fn recreated_room_resets_language() {
        let mut registry = RoomRegistry::default();
        registry.add_member("abc", "alice");
        registry.set_language("abc", "python");
        registry.remove_member("abc", "alice");

        registry.add_member("abc", "bob");

        assert_eq!(registry.language("abc"), Some("javascript"));
    }

    #[test]
    fn stale_removals_are_noops() {
        let mut registry = RoomRegistry::default();

        assert_eq!(registry.remove_member("ghost", "alice"), Removal::NotMember);

        registry.add_member("abc", "alice");
        assert_eq!(registry.remove_member("abc", "bob"), Removal::NotMember);
        assert_eq!(registry.members("abc").unwrap(), list(&["alice"]));
    }

    #[test]
    fn set_language_never_creates_room() {
        let mut registry = RoomRegistry::default();

        assert!(!registry.set_language("abc", "python"));
        assert!(!registry.has_room("abc"));

        registry.add_member("abc", "alice");
        assert!(registry.set_language("abc", "python"));
        assert_eq!(registry.language("abc"), Some("python"));
    }

    #[test]
    fn purge_removes_identity_everywhere() {
        let mut registry = RoomRegistry::default();
        registry.add_member("r1", "alice");
        registry.add_member("r2", "alice");
        registry.add_member("r2", "bob");
        registry.add_member("r3", "bob");

        let affected = registry.purge("alice");

        assert_eq!(affected, vec![
            ("r1".to_string(), Removal::RoomDeleted),
            ("r2".to_string(), Removal::Remaining(list(&["bob"]))),
        ]);
        assert!(!registry.has_room("r1"));
        assert_eq!(registry.members("r2").unwrap(), list(&["bob"]));
        assert_eq!(registry.members("r3").unwrap(), list(&["bob"]));
        assert_eq!(registry.rooms_of("alice").count(), 0);
    }

    #[test]
    fn purge_unknown_identity_is_empty() {
        let mut registry = RoomRegistry::default();
        registry.add_member("abc", "bob");

        assert!(registry.purge("alice").is_empty());
        assert_eq!(registry.room_count(), 1);
    }
}
