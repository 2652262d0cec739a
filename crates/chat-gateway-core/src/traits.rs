//! Core traits for the agent and the client send-path.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Session identifier.
pub type SessionId = Uuid;

/// Transport-level identity of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh connection identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message pushed from the gateway to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Sent once, immediately after the connection opens.
    Greeting(String),
    /// The agent's answer to a turn.
    Reply(String),
    /// Sent in place of a reply when the agent call failed.
    Fallback(String),
}

impl Outbound {
    /// Text carried by this message.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Greeting(s) | Self::Reply(s) | Self::Fallback(s) => s,
        }
    }

    /// Consume the message and return its text.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Greeting(s) | Self::Reply(s) | Self::Fallback(s) => s,
        }
    }
}

/// Send-path error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,
}

/// Send capability for one client connection.
///
/// Implementations must not block: the actor calls `send` from its task.
pub trait ReplySink: Send + Sync {
    /// Push a message toward the client.
    ///
    /// # Errors
    /// Returns `SendError::Closed` once the underlying transport is gone.
    fn send(&self, msg: Outbound) -> Result<(), SendError>;
}

impl ReplySink for mpsc::UnboundedSender<Outbound> {
    fn send(&self, msg: Outbound) -> Result<(), SendError> {
        Self::send(self, msg).map_err(|_| SendError::Closed)
    }
}

/// A client connection as seen by the core: a stable key plus a send-path.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sink: Arc<dyn ReplySink>,
}

impl ConnectionHandle {
    /// Bind a connection identity to its send-path.
    #[must_use]
    pub fn new(id: ConnectionId, sink: Arc<dyn ReplySink>) -> Self {
        Self { id, sink }
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Shared send-path for this connection.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn ReplySink> {
        Arc::clone(&self.sink)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Agent invocation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent call failed: {0}")]
    Failed(String),
    #[error("agent call timed out after {0:?}")]
    TimedOut(Duration),
    #[error("agent returned an empty reply")]
    EmptyReply,
}

/// A stateful conversational agent.
///
/// The agent owns conversation memory, keyed by session. The gateway
/// guarantees at most one outstanding `reply` per session.
#[async_trait]
pub trait ConversationAgent: Send + Sync {
    /// Produce a reply to `message` within the context of `session_id`.
    async fn reply(&self, session_id: SessionId, message: &str) -> Result<String, AgentError>;
}

#[async_trait]
impl<A> ConversationAgent for Arc<A>
where
    A: ConversationAgent + ?Sized,
{
    async fn reply(&self, session_id: SessionId, message: &str) -> Result<String, AgentError> {
        (**self).reply(session_id, message).await
    }
}
