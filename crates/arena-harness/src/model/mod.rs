//! Model-based testing support.
//!
//! Operations are applied to both the reference [`ModelWorld`] and the real
//! driver (through [`SimServer`](crate::SimServer)), and their observable
//! states are compared.

mod operation;
mod world;

pub use operation::{
    ClientId, IDENTITY_POOL, ModelLanguage, ModelRoomId, Operation, OperationError,
    OperationResult, chat_body, code_payload, identity_for, room_name,
};
pub use world::{ModelRoom, ModelWorld, ObservableState};
