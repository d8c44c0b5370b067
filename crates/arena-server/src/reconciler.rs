//! Disconnect reconciliation.
//!
//! A dropped connection never sends `leave-room`, so its identity would
//! linger in every room it joined. On `ConnectionClosed` the driver walks the
//! identity's rooms and runs the same departure logic an explicit leave
//! would, producing identical member-list broadcasts.
//!
//! Identities are not unique across connections. An identity is only purged
//! from a room once none of its sessions remain subscribed there, so a
//! reconnect that races the old socket's teardown keeps its membership.

use arena_proto::RoomId;

use crate::{
    driver::{LogLevel, ServerAction, ServerDriver, departure_actions},
    rooms::Removal,
};

impl ServerDriver {
    /// Tear down a session and reconcile the rooms it was in.
    ///
    /// Safe to call for sessions that were never registered (for example a
    /// connection refused at the connection limit) and for inert sessions.
    pub(crate) fn reconcile_disconnect(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        let Some((info, subscribed)) = self.registry.unregister_session(session_id) else {
            return vec![ServerAction::log(
                LogLevel::Debug,
                format!("close for unknown session {} ignored", session_id),
            )];
        };

        let Some(identity) = info.identity else {
            return vec![ServerAction::log(
                LogLevel::Debug,
                format!("inert session {} closed: {}", session_id, reason),
            )];
        };

        let affected: Vec<(RoomId, Removal)> =
            if self.registry.sessions_for_identity(&identity).next().is_none() {
                self.rooms.purge(&identity)
            } else {
                let mut rooms: Vec<RoomId> = subscribed
                    .into_iter()
                    .filter(|room_id| {
                        !self.registry.identity_present_elsewhere(&identity, room_id, session_id)
                    })
                    .collect();
                rooms.sort();

                rooms
                    .into_iter()
                    .map(|room_id| {
                        let removal = self.rooms.remove_member(&room_id, &identity);
                        (room_id, removal)
                    })
                    .collect()
            };

        let mut actions = vec![ServerAction::log(
            LogLevel::Info,
            format!(
                "session {} ('{}') closed: {}; leaving {} room(s)",
                session_id,
                identity,
                reason,
                affected.len()
            ),
        )];

        for (room_id, removal) in affected {
            actions.extend(departure_actions(&room_id, &identity, removal));
        }

        actions
    }
}
