//! Core abstractions for the conversational gateway.
//!
//! This crate provides the fundamental building blocks:
//! - `ConversationAgent` - The agent capability the gateway drives
//! - `ReplySink` / `ConnectionHandle` - The send-path back to a client
//! - `GatewayError` - Error taxonomy shared by every layer
//! - `GatewayConfig` - Greeting, failure presentation and limits

pub mod agent;
pub mod config;
pub mod error;
pub mod traits;

pub use agent::{EchoAgent, TimeoutAgent};
pub use config::{FailureReply, GatewayConfig};
pub use error::{ErrorKind, GatewayError};
pub use traits::{
    AgentError, ConnectionHandle, ConnectionId, ConversationAgent, Outbound, ReplySink,
    SendError, SessionId,
};
