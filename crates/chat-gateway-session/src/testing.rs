//! Test agents and sinks.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chat_gateway_core::{AgentError, ConversationAgent, Outbound, ReplySink, SessionId};
use tokio::sync::{Notify, Semaphore, mpsc};

/// Sink backed by an unbounded channel. The returned `Arc` is the only sender.
pub fn channel_sink() -> (Arc<dyn ReplySink>, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

/// Agent that answers `reply to <message>` and records every call.
///
/// Messages starting with `slow` take longer than the rest.
#[derive(Default)]
pub struct ScriptedAgent {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_on: Option<String>,
    empty_on: Option<String>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, message: &str) -> Self {
        self.fail_on = Some(message.to_string());
        self
    }

    pub fn empty_on(mut self, message: &str) -> Self {
        self.empty_on = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationAgent for ScriptedAgent {
    async fn reply(&self, _session_id: SessionId, message: &str) -> Result<String, AgentError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().unwrap().push(message.to_string());

        let delay = if message.starts_with("slow") {
            Duration::from_millis(200)
        } else {
            Duration::from_millis(5)
        };
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(message) {
            return Err(AgentError::Failed("scripted failure".to_string()));
        }
        if self.empty_on.as_deref() == Some(message) {
            return Ok("   ".to_string());
        }
        Ok(format!("reply to {message}"))
    }
}

/// Agent whose calls block until the test releases them.
pub struct GatedAgent {
    gate: Semaphore,
    started: Notify,
    started_count: AtomicUsize,
    completed: AtomicUsize,
}

impl GatedAgent {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: Notify::new(),
            started_count: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Wait until at least one call has started.
    pub async fn started(&self) {
        loop {
            let notified = self.started.notified();
            if self.started_count.load(Ordering::SeqCst) > 0 {
                return;
            }
            notified.await;
        }
    }

    /// Let one blocked call finish.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationAgent for GatedAgent {
    async fn reply(&self, _session_id: SessionId, message: &str) -> Result<String, AgentError> {
        self.started_count.fetch_add(1, Ordering::SeqCst);
        self.started.notify_waiters();

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AgentError::Failed(e.to_string()))?;
        permit.forget();

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(format!("late reply to {message}"))
    }
}
