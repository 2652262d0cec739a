//! Reference agents and agent wrappers.

use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{AgentError, ConversationAgent, SessionId};

/// Agent that answers every message by repeating it back.
///
/// Useful for wiring up a transport before a real agent exists.
#[derive(Debug, Default, Clone)]
pub struct EchoAgent;

#[async_trait]
impl ConversationAgent for EchoAgent {
    async fn reply(&self, _session_id: SessionId, message: &str) -> Result<String, AgentError> {
        Ok(format!("You said: {message}"))
    }
}

/// Wraps an agent with a per-call deadline.
///
/// An elapsed deadline surfaces as [`AgentError::TimedOut`]. The inner
/// future is dropped at that point; agents that must finish their work
/// regardless should spawn it themselves.
#[derive(Debug, Clone)]
pub struct TimeoutAgent<A> {
    inner: A,
    timeout: Duration,
}

impl<A> TimeoutAgent<A> {
    /// Wrap `inner` so each call fails after `timeout`.
    #[must_use]
    pub const fn new(inner: A, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<A> ConversationAgent for TimeoutAgent<A>
where
    A: ConversationAgent,
{
    async fn reply(&self, session_id: SessionId, message: &str) -> Result<String, AgentError> {
        match tokio::time::timeout(self.timeout, self.inner.reply(session_id, message)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%session_id, timeout = ?self.timeout, "Agent call timed out");
                Err(AgentError::TimedOut(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    use super::*;

    struct SlowAgent(Duration);

    #[async_trait]
    impl ConversationAgent for SlowAgent {
        async fn reply(&self, _session_id: SessionId, _message: &str) -> Result<String, AgentError> {
            tokio::time::sleep(self.0).await;
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn test_echo_agent_repeats_message() {
        let reply = assert_ok!(EchoAgent.reply(Uuid::new_v4(), "hello").await);
        assert_eq!(reply, "You said: hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_agent_passes_fast_replies() {
        let agent = TimeoutAgent::new(SlowAgent(Duration::from_millis(10)), Duration::from_secs(1));
        let reply = assert_ok!(agent.reply(Uuid::new_v4(), "hi").await);
        assert_eq!(reply, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_agent_maps_deadline_to_error() {
        let agent = TimeoutAgent::new(SlowAgent(Duration::from_secs(30)), Duration::from_secs(5));
        let err = assert_err!(agent.reply(Uuid::new_v4(), "hi").await);
        assert_eq!(err, AgentError::TimedOut(Duration::from_secs(5)));
    }
}
