//! Connection-to-session registry.
//!
//! The registry is the only shared, mutated structure in the gateway. Each
//! entry is inserted and removed under a single write-lock acquisition, so
//! concurrent lookups never observe a half-created or half-removed session.

use std::collections::HashMap;

use chat_gateway_core::{ConnectionId, GatewayError, SessionId};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::actor::{SessionHandle, TurnState};

/// Summary of one live binding.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub connection_id: ConnectionId,
    pub session_id: SessionId,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
    pub state: TurnState,
}

/// Registry of live sessions, keyed by connection.
pub struct SessionRegistry {
    entries: RwLock<HashMap<ConnectionId, SessionHandle>>,
    max_sessions: Option<usize>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionRegistry {
    /// Create a registry holding at most `max_sessions` live sessions.
    #[must_use]
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Bind a new session to `connection`.
    ///
    /// `spawn` receives the new session id and starts the session's actor.
    /// It runs only once the binding is known to be valid.
    ///
    /// # Errors
    /// Returns `Capacity` when the registry is full, or `AlreadyOpen` if the
    /// connection already has a session.
    pub async fn open<F>(&self, connection: ConnectionId, spawn: F) -> Result<SessionId, GatewayError>
    where
        F: FnOnce(SessionId) -> SessionHandle,
    {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(&connection) {
            return Err(GatewayError::AlreadyOpen {
                connection,
                session: existing.session_id(),
            });
        }

        if let Some(limit) = self.max_sessions {
            if entries.len() >= limit {
                return Err(GatewayError::Capacity { limit });
            }
        }

        let session_id = Uuid::new_v4();
        let handle = spawn(session_id);
        entries.insert(connection, handle);

        debug!(%connection, %session_id, live = entries.len(), "Session registered");
        Ok(session_id)
    }

    /// Find the session bound to `connection`.
    ///
    /// # Errors
    /// Returns `NotFound` if the connection has no live session.
    pub async fn lookup(&self, connection: ConnectionId) -> Result<SessionHandle, GatewayError> {
        self.entries
            .read()
            .await
            .get(&connection)
            .cloned()
            .ok_or(GatewayError::NotFound(connection))
    }

    /// Release the binding for `connection` and return its handle.
    ///
    /// # Errors
    /// Returns `NotOpen` if the connection was never opened or is already closed.
    pub async fn close(&self, connection: ConnectionId) -> Result<SessionHandle, GatewayError> {
        let mut entries = self.entries.write().await;
        let handle = entries
            .remove(&connection)
            .ok_or(GatewayError::NotOpen(connection))?;

        debug!(
            %connection,
            session_id = %handle.session_id(),
            live = entries.len(),
            "Session unregistered"
        );
        Ok(handle)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Summaries of all live sessions, oldest first.
    pub async fn snapshot(&self) -> Vec<SessionSummary> {
        let mut result: Vec<SessionSummary> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(connection_id, handle)| SessionSummary {
                connection_id: *connection_id,
                session_id: handle.session_id(),
                created_at: handle.created_at(),
                state: handle.state(),
            })
            .collect();

        result.sort_by_key(|s| s.created_at);
        result
    }
}
