//! Testing harness for the Arena room coordinator.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the [`ModelWorld`] and the real
//! driver wrapped in a [`SimServer`], and their observable states are
//! compared: room membership, languages, subscriptions and every message
//! each client received.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the
//! coordinator's invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_server;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, LanguageDefined, ReverseIndexConsistency,
    RoomSnapshot, RoomsNonEmpty, SessionSnapshot, SubscriptionMembership, SystemSnapshot,
    Violation,
};
pub use model::{
    ClientId, IDENTITY_POOL, ModelLanguage, ModelRoom, ModelRoomId, ModelWorld, ObservableState,
    Operation, OperationError, OperationResult,
};
pub use sim_server::SimServer;
