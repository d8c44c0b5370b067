//! Presence snapshots.
//!
//! Every membership change broadcasts the room's complete member list. Clients
//! replace their local view wholesale; there are no diffs to apply and no
//! ordering to rely on.

use std::collections::{BTreeSet, HashSet};

use arena_proto::{Identity, ServerMessage};

/// Snapshot of a room's members at one point in time.
///
/// # Invariants
///
/// - Each identity appears at most once.
/// - Equality is set equality. Two snapshots listing the same identities are
///   the same state, whatever order the wire shows them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberList {
    members: BTreeSet<Identity>,
}

impl MemberList {
    /// Snapshot of the given member set.
    pub fn from_members(members: &HashSet<Identity>) -> Self {
        Self { members: members.iter().cloned().collect() }
    }

    /// Empty snapshot, as seen for a deleted or unknown room.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the room has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `identity` is a member.
    pub fn contains(&self, identity: &str) -> bool {
        self.members.contains(identity)
    }

    /// Members in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(String::as_str)
    }

    /// The `active-users` broadcast for this snapshot.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::ActiveUsers(self.members.iter().cloned().collect())
    }
}

impl<S: Into<Identity>> FromIterator<S> for MemberList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self { members: iter.into_iter().map(Into::into).collect() }
    }
}
