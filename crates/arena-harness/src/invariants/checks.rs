//! Standard invariant checks.
//!
//! These invariants capture what must hold after every event the driver
//! processes, whatever the interleaving of joins, leaves and disconnects.

use super::{Invariant, InvariantResult, SystemSnapshot};

/// A room exists only while it has members.
///
/// An empty room left behind would keep its language alive and resurface it
/// on the next join, instead of the default.
pub struct RoomsNonEmpty;

impl Invariant for RoomsNonEmpty {
    fn name(&self) -> &'static str {
        "rooms_non_empty"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match state.rooms.iter().find(|(_, room)| room.members.is_empty()) {
            Some((room_id, _)) => Err(self.violation(format!("room '{room_id}' has no members"))),
            None => Ok(()),
        }
    }
}

/// The identity → rooms index agrees with room membership in both directions.
pub struct ReverseIndexConsistency;

impl Invariant for ReverseIndexConsistency {
    fn name(&self) -> &'static str {
        "reverse_index_consistency"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (room_id, room) in &state.rooms {
            for identity in &room.members {
                let indexed = state.identity_rooms.get(identity).is_some_and(|r| r.contains(room_id));
                if !indexed {
                    return Err(self.violation(format!(
                        "'{identity}' is in room '{room_id}' but not indexed there"
                    )));
                }
            }
        }

        for (identity, rooms) in &state.identity_rooms {
            if rooms.is_empty() {
                return Err(self.violation(format!("'{identity}' has an empty index entry")));
            }
            for room_id in rooms {
                let member = state.rooms.get(room_id).is_some_and(|r| r.members.contains(identity));
                if !member {
                    return Err(self.violation(format!(
                        "'{identity}' indexed in room '{room_id}' but not a member"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Every room a session is subscribed to lists the session's identity.
///
/// Inert sessions have no identity and so may not be subscribed anywhere.
pub struct SubscriptionMembership;

impl Invariant for SubscriptionMembership {
    fn name(&self) -> &'static str {
        "subscription_membership"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (session_id, session) in &state.sessions {
            let Some(identity) = &session.identity else {
                if !session.rooms.is_empty() {
                    return Err(self.violation(format!(
                        "inert session {session_id} subscribed to {:?}",
                        session.rooms
                    )));
                }
                continue;
            };

            for room_id in &session.rooms {
                let member = state.rooms.get(room_id).is_some_and(|r| r.members.contains(identity));
                if !member {
                    return Err(self.violation(format!(
                        "session {session_id} ('{identity}') subscribed to '{room_id}' without membership"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Every live room carries a non-empty language.
pub struct LanguageDefined;

impl Invariant for LanguageDefined {
    fn name(&self) -> &'static str {
        "language_defined"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match state.rooms.iter().find(|(_, room)| room.language.is_empty()) {
            Some((room_id, _)) => Err(self.violation(format!("room '{room_id}' has no language"))),
            None => Ok(()),
        }
    }
}
