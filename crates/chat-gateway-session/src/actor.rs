//! Per-session actor that serializes turns.
//!
//! Each live connection gets a dedicated actor task that:
//! - Runs turns strictly in submission order, one agent call at a time
//! - Owns the session's turn state and the send-path to the client
//! - Discards late agent results once the connection has closed

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use chat_gateway_core::{
    AgentError, ConversationAgent, FailureReply, GatewayError, Outbound, ReplySink, SessionId,
};
use serde::Serialize;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tracing::{Instrument, debug, info_span, warn};

/// Turn state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No agent call outstanding.
    Idle,
    /// An agent call is outstanding.
    AwaitingReply,
    /// The connection closed. No further turns are accepted.
    Terminated,
}

/// One queued request.
#[derive(Debug, Clone)]
struct Turn {
    seq: u64,
    input: String,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Cloneable handle to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    created_at: i64,
    turn_tx: mpsc::Sender<Turn>,
    max_pending: usize,
    abandon_tx: Arc<watch::Sender<bool>>,
    state_rx: watch::Receiver<TurnState>,
    next_seq: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Session identifier.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Creation timestamp (Unix epoch seconds).
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Current turn state.
    #[must_use]
    pub fn state(&self) -> TurnState {
        *self.state_rx.borrow()
    }

    /// Enqueue a turn and return its sequence number.
    ///
    /// # Errors
    /// Returns `GatewayError::Terminated` once the session has been abandoned,
    /// or `GatewayError::QueueFull` when too many turns are already waiting
    /// behind the one in flight. The text is dropped, not queued.
    pub fn submit(&self, text: impl Into<String>) -> Result<u64, GatewayError> {
        if *self.abandon_tx.borrow() {
            return Err(GatewayError::Terminated(self.session_id));
        }

        let permit = self.turn_tx.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => GatewayError::QueueFull {
                session: self.session_id,
                limit: self.max_pending,
            },
            TrySendError::Closed(()) => GatewayError::Terminated(self.session_id),
        })?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        permit.send(Turn {
            seq,
            input: text.into(),
        });

        Ok(seq)
    }

    /// Mark the session abandoned.
    ///
    /// Returns immediately; an outstanding agent call is left to finish and
    /// its result is discarded. Queued turns are dropped.
    ///
    /// # Errors
    /// Returns `GatewayError::Terminated` if the session was already abandoned.
    pub fn abandon(&self) -> Result<TurnState, GatewayError> {
        let state = self.state();
        if self.abandon_tx.send_replace(true) {
            return Err(GatewayError::Terminated(self.session_id));
        }
        Ok(state)
    }

    /// Wait until the actor task has stopped.
    pub async fn terminated(&self) {
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx
            .wait_for(|state| *state == TurnState::Terminated)
            .await;
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Per-session actor.
pub struct SessionActor {
    session_id: SessionId,
    agent: Arc<dyn ConversationAgent>,
    sink: Arc<dyn ReplySink>,
    failure_reply: FailureReply,
    turn_rx: mpsc::Receiver<Turn>,
    abandon_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<TurnState>,
}

impl SessionActor {
    /// Spawn an actor for `session_id` and return its handle.
    ///
    /// At most `max_pending` turns may wait behind the one in flight.
    #[must_use]
    pub fn spawn(
        session_id: SessionId,
        agent: Arc<dyn ConversationAgent>,
        sink: Arc<dyn ReplySink>,
        failure_reply: FailureReply,
        max_pending: usize,
    ) -> SessionHandle {
        let max_pending = max_pending.max(1);
        let (turn_tx, turn_rx) = mpsc::channel(max_pending);
        let (abandon_tx, abandon_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);

        let actor = Self {
            session_id,
            agent,
            sink,
            failure_reply,
            turn_rx,
            abandon_rx,
            state_tx,
        };
        tokio::spawn(actor.run());

        SessionHandle {
            session_id,
            created_at: now(),
            turn_tx,
            max_pending,
            abandon_tx: Arc::new(abandon_tx),
            state_rx,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn run(mut self) {
        debug!(session_id = %self.session_id, "Session actor started");

        loop {
            if *self.abandon_rx.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                changed = self.abandon_rx.changed() => {
                    // All handles dropped without an explicit close.
                    if changed.is_err() {
                        break;
                    }
                }

                turn = self.turn_rx.recv() => {
                    let Some(turn) = turn else { break };
                    if !self.run_turn(turn).await {
                        break;
                    }
                }
            }
        }

        self.terminate();
    }

    /// Run one turn to completion. Returns `false` if the session was
    /// abandoned while the agent call was outstanding.
    async fn run_turn(&mut self, turn: Turn) -> bool {
        let span = info_span!("turn", session_id = %self.session_id, turn = turn.seq);

        async {
            self.state_tx.send_replace(TurnState::AwaitingReply);

            let result = match self.agent.reply(self.session_id, &turn.input).await {
                Ok(text) if text.trim().is_empty() => Err(AgentError::EmptyReply.into()),
                Ok(text) => Ok(text),
                Err(e) => Err(GatewayError::from(e)),
            };

            if *self.abandon_rx.borrow() {
                debug!("Connection closed during turn, discarding outcome");
                return false;
            }

            let outbound = match result {
                Ok(text) => Outbound::Reply(text),
                Err(e) => {
                    warn!(error = %e, kind = ?e.kind(), "Agent call failed, sending fallback");
                    Outbound::Fallback(self.failure_reply.render(&e))
                }
            };

            self.state_tx.send_replace(TurnState::Idle);

            if let Err(e) = self.sink.send(outbound) {
                warn!(error = %e, "Failed to deliver turn outcome");
            }
            true
        }
        .instrument(span)
        .await
    }

    fn terminate(&mut self) {
        self.turn_rx.close();
        let mut dropped = 0usize;
        while self.turn_rx.try_recv().is_ok() {
            dropped += 1;
        }

        self.state_tx.send_replace(TurnState::Terminated);
        debug!(session_id = %self.session_id, dropped, "Session actor stopped");
    }
}
