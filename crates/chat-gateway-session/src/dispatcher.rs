//! Dispatcher translating transport lifecycle events into session operations.

use std::sync::Arc;

use chat_gateway_core::{
    ConnectionHandle, ConnectionId, ConversationAgent, FailureReply, GatewayConfig, GatewayError,
    Outbound, SessionId, TimeoutAgent,
};
use tracing::{debug, info, warn};

use crate::{actor::SessionActor, registry::SessionRegistry};

/// Entry point for the transport layer.
///
/// The transport must call `on_open` once, then `on_message` for each inbound
/// message in arrival order, then `on_close` once. Every error returned here
/// is local to the connection it names and has already been logged.
pub struct GatewayDispatcher {
    registry: SessionRegistry,
    agent: Arc<dyn ConversationAgent>,
    greeting: String,
    failure_reply: FailureReply,
    max_pending_turns: usize,
}

impl GatewayDispatcher {
    /// Create a dispatcher driving `agent`.
    ///
    /// When the config sets an agent timeout, every call is wrapped in a
    /// [`TimeoutAgent`].
    #[must_use]
    pub fn new(agent: Arc<dyn ConversationAgent>, config: &GatewayConfig) -> Self {
        let agent: Arc<dyn ConversationAgent> = match config.agent_timeout() {
            Some(timeout) => Arc::new(TimeoutAgent::new(agent, timeout)),
            None => agent,
        };

        Self {
            registry: SessionRegistry::new(config.max_sessions),
            agent,
            greeting: config.greeting.clone(),
            failure_reply: config.failure_reply.clone(),
            max_pending_turns: config.max_pending_turns,
        }
    }

    /// Session registry.
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// A connection opened: create its session and greet the client.
    ///
    /// The greeting is pushed before the session becomes visible, so it is
    /// always the first outbound message.
    ///
    /// # Errors
    /// Returns `Capacity` if no more sessions can be tracked (the transport
    /// should refuse the connection), or `AlreadyOpen` on a repeated open.
    pub async fn on_open(&self, connection: &ConnectionHandle) -> Result<SessionId, GatewayError> {
        let sink = connection.sink();
        let result = self
            .registry
            .open(connection.id(), |session_id| {
                if let Err(e) = sink.send(Outbound::Greeting(self.greeting.clone())) {
                    warn!(connection_id = %connection.id(), error = %e, "Failed to send greeting");
                }
                SessionActor::spawn(
                    session_id,
                    Arc::clone(&self.agent),
                    Arc::clone(&sink),
                    self.failure_reply.clone(),
                    self.max_pending_turns,
                )
            })
            .await;

        match &result {
            Ok(session_id) => {
                info!(connection_id = %connection.id(), %session_id, "Session opened");
            }
            Err(e) => {
                warn!(connection_id = %connection.id(), error = %e, "Refusing connection");
            }
        }
        result
    }

    /// A message arrived: hand it to the connection's session.
    ///
    /// Returns the turn's sequence number within the session.
    ///
    /// # Errors
    /// Returns `NotFound` if the connection has no session, `Terminated` if
    /// the session is closing, or `QueueFull` if the session already has too
    /// many turns waiting. The message is dropped in every case.
    pub async fn on_message(
        &self,
        connection: ConnectionId,
        text: impl Into<String>,
    ) -> Result<u64, GatewayError> {
        let result = match self.registry.lookup(connection).await {
            Ok(handle) => handle.submit(text),
            Err(e) => Err(e),
        };

        match &result {
            Ok(turn) => debug!(connection_id = %connection, turn, "Turn queued"),
            Err(e) => warn!(connection_id = %connection, error = %e, "Dropping message"),
        }
        result
    }

    /// A connection closed: abandon its in-flight turn and release the session.
    ///
    /// Does not wait for an outstanding agent call.
    ///
    /// # Errors
    /// Returns `NotOpen` if the connection was never opened or already closed.
    pub async fn on_close(&self, connection: ConnectionId) -> Result<(), GatewayError> {
        if let Ok(handle) = self.registry.lookup(connection).await {
            match handle.abandon() {
                Ok(state) => debug!(
                    connection_id = %connection,
                    session_id = %handle.session_id(),
                    ?state,
                    "Session abandoned"
                ),
                Err(e) => warn!(connection_id = %connection, error = %e, "Session already abandoned"),
            }
        }

        match self.registry.close(connection).await {
            Ok(handle) => {
                info!(
                    connection_id = %connection,
                    session_id = %handle.session_id(),
                    "Session closed"
                );
                Ok(())
            }
            Err(e) => {
                warn!(connection_id = %connection, error = %e, "Ignoring close");
                Err(e)
            }
        }
    }
}
