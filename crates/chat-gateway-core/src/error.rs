//! Gateway error taxonomy.

use thiserror::Error;

use crate::traits::{AgentError, ConnectionId, SessionId};

/// Coarse classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No room for another session.
    Capacity,
    /// A lifecycle operation was invoked out of order.
    InvalidState,
    /// No active session for the connection.
    NotFound,
    /// The agent call failed or timed out.
    AgentFailure,
}

/// Gateway error.
///
/// Every variant is local to one connection and recoverable from the
/// dispatcher's point of view.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("session capacity reached ({limit} live sessions)")]
    Capacity { limit: usize },
    #[error("session {session} already has {limit} turns pending")]
    QueueFull { session: SessionId, limit: usize },
    #[error("connection {connection} is already bound to session {session}")]
    AlreadyOpen {
        connection: ConnectionId,
        session: SessionId,
    },
    #[error("connection {0} is not open")]
    NotOpen(ConnectionId),
    #[error("session {0} is terminated")]
    Terminated(SessionId),
    #[error("no active session for connection {0}")]
    NotFound(ConnectionId),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl GatewayError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Capacity { .. } | Self::QueueFull { .. } => ErrorKind::Capacity,
            Self::AlreadyOpen { .. } | Self::NotOpen(_) | Self::Terminated(_) => {
                ErrorKind::InvalidState
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Agent(_) => ErrorKind::AgentFailure,
        }
    }
}
