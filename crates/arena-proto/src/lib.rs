//! Arena wire protocol.
//!
//! Clients talk to the coordinator over a WebSocket carrying JSON text frames
//! of the form `{"event": <name>, "data": <payload>}`. This crate owns the
//! three pieces of that contract and nothing else:
//!
//! - [`Handshake`]: parameters a client supplies on the upgrade request
//!   (`?username=<identity>&roomId=<hint>`)
//! - [`ClientEvent`]: inbound events (`join-room`, `set-language`,
//!   `code-update`, `send-message`, `leave-room`)
//! - [`ServerMessage`]: outbound events (`room-language`, `active-users`,
//!   `update-code`, `receive-message`)
//!
//! Decoding is strict about the fields the coordinator routes on (`roomId`,
//! `language`, `message`) and lenient about everything else: a `code-update`
//! payload is relayed verbatim, including fields this crate has never heard
//! of.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod event;
pub mod handshake;
pub mod message;

pub use errors::{ProtocolError, Result};
pub use event::ClientEvent;
pub use handshake::Handshake;
pub use message::{ChatMessage, ServerMessage};

/// Opaque, case-sensitive room identifier supplied by clients.
pub type RoomId = String;

/// Display identity claimed by a connection at handshake time.
pub type Identity = String;
