//! Driver error types.
//!
//! Participant input never produces these: malformed frames, stale leaves and
//! unknown rooms are all absorbed by the driver and surface only as log
//! actions. A `DriverError` means the runtime fed the driver an event that
//! contradicts its own bookkeeping.

use thiserror::Error;

/// Errors that can occur while processing a [`ServerEvent`](crate::ServerEvent).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Session not found in registry.
    ///
    /// A frame arrived for a session that was never accepted or was already
    /// closed. The runtime must not deliver frames after `ConnectionClosed`.
    #[error("session not found: {0}")]
    SessionNotFound(u64),

    /// Session already registered.
    ///
    /// Attempting to accept a session ID that already exists. This is a
    /// logic bug in ID assignment.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display() {
        let err = DriverError::SessionNotFound(42);
        assert_eq!(err.to_string(), "session not found: 42");

        let err = DriverError::SessionAlreadyExists(123);
        assert_eq!(err.to_string(), "session already exists: 123");
    }
}
