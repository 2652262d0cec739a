//! Session lifecycle and request routing for the conversational gateway.
//!
//! Provides:
//! - `SessionRegistry` - Connection-to-session bindings
//! - `SessionActor` - Per-session turn serialization
//! - `GatewayDispatcher` - Transport event entry point

pub mod actor;
pub mod dispatcher;
pub mod registry;

#[cfg(test)]
mod testing;

pub use actor::{SessionActor, SessionHandle, TurnState};
pub use dispatcher::GatewayDispatcher;
pub use registry::{SessionRegistry, SessionSummary};
