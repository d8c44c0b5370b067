//! Connection handshake parameters.
//!
//! Clients identify themselves on the WebSocket upgrade request:
//! `ws://host/?username=alice&roomId=abc`. The identity is trusted as given;
//! authenticating it is the job of whatever issued it.

use url::form_urlencoded;

use crate::{Identity, RoomId};

/// Query key carrying the display identity.
pub const USERNAME_KEY: &str = "username";
/// Query key carrying the optional room hint.
pub const ROOM_ID_KEY: &str = "roomId";

/// Parameters extracted from the upgrade request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// Claimed display identity, if any
    pub username: Option<Identity>,
    /// Room the client intends to use. Informational only: joining still
    /// requires an explicit `join-room` event.
    pub room_id: Option<RoomId>,
}

impl Handshake {
    /// Handshake carrying just an identity.
    pub fn with_identity(username: impl Into<Identity>) -> Self {
        Self { username: Some(username.into()), room_id: None }
    }

    /// Parse the query component of the upgrade URI.
    ///
    /// Values are URL-decoded. When a key repeats, the first occurrence wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut handshake = Self::default();

        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                USERNAME_KEY if handshake.username.is_none() => {
                    handshake.username = Some(value.into_owned());
                },
                ROOM_ID_KEY if handshake.room_id.is_none() => {
                    handshake.room_id = Some(value.into_owned());
                },
                _ => {},
            }
        }

        handshake
    }

    /// Resolved identity. `None` when absent or empty.
    pub fn identity(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}
