//! Server error types.

use arena_proto::ProtocolError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::server_error::DriverError;

/// Errors that can occur in the server runtime.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error (invalid bind address, etc.).
    ///
    /// Fatal: prevents server startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (socket failure, WebSocket handshake, I/O).
    ///
    /// Fatal for the affected connection only; the server keeps serving
    /// everyone else.
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error while encoding an outbound message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Internal error (unexpected state, logic bug, etc.).
    #[error("internal error: {0}")]
    Internal(String),

    /// Driver rejected an event. Indicates a runtime bookkeeping bug.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<tungstenite::Error> for ServerError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
