//! Gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GatewayError;

/// Greeting sent to every client when its connection opens.
pub const DEFAULT_GREETING: &str = "Welcome to Miles of Smiles! How can I help you today?";

/// Reply sent in place of an answer when the agent call fails.
pub const DEFAULT_FALLBACK_TEXT: &str =
    "I'm sorry, I wasn't able to process that request. Please try again in a moment.";

/// Turns a session may queue behind the one in flight.
pub const DEFAULT_MAX_PENDING_TURNS: usize = 32;

fn default_fallback_text() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

/// How a failed agent call is presented to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailureReply {
    /// Send a fixed apology.
    Apology {
        #[serde(default = "default_fallback_text")]
        text: String,
    },
    /// Send a short description of the agent error.
    Detail,
}

impl Default for FailureReply {
    fn default() -> Self {
        Self::Apology {
            text: default_fallback_text(),
        }
    }
}

impl FailureReply {
    /// Text delivered to the client for a failed turn.
    #[must_use]
    pub fn render(&self, error: &GatewayError) -> String {
        match self {
            Self::Apology { text } => text.clone(),
            Self::Detail => format!("Sorry, something went wrong: {error}"),
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Greeting sent on connection open.
    pub greeting: String,
    /// Presentation of agent failures.
    pub failure_reply: FailureReply,
    /// Maximum number of live sessions. `None` means unbounded.
    pub max_sessions: Option<usize>,
    /// Per-call agent deadline in milliseconds. `None` disables it.
    pub agent_timeout_ms: Option<u64>,
    /// Turns a session may queue behind the one in flight.
    pub max_pending_turns: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            failure_reply: FailureReply::default(),
            max_sessions: None,
            agent_timeout_ms: None,
            max_pending_turns: DEFAULT_MAX_PENDING_TURNS,
        }
    }
}

impl GatewayConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns error if the document is not valid config JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `GATEWAY_*` environment variables.
    ///
    /// # Errors
    /// Returns error if a variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognized keys: `GATEWAY_GREETING`, `GATEWAY_FALLBACK_TEXT`,
    /// `GATEWAY_FAILURE_REPLY` (`apology` or `detail`), `GATEWAY_MAX_SESSIONS`,
    /// `GATEWAY_AGENT_TIMEOUT_MS` and `GATEWAY_MAX_PENDING_TURNS`.
    ///
    /// # Errors
    /// Returns error if a variable holds an unparsable value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(greeting) = lookup("GATEWAY_GREETING") {
            self.greeting = greeting;
        }

        match lookup("GATEWAY_FAILURE_REPLY").as_deref() {
            None => {}
            Some("apology") => {
                if !matches!(self.failure_reply, FailureReply::Apology { .. }) {
                    self.failure_reply = FailureReply::default();
                }
            }
            Some("detail") => self.failure_reply = FailureReply::Detail,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "GATEWAY_FAILURE_REPLY",
                    value: other.to_string(),
                });
            }
        }

        if let Some(text) = lookup("GATEWAY_FALLBACK_TEXT") {
            if let FailureReply::Apology { text: current } = &mut self.failure_reply {
                *current = text;
            }
        }

        if let Some(raw) = lookup("GATEWAY_MAX_SESSIONS") {
            self.max_sessions = Some(parse_number("GATEWAY_MAX_SESSIONS", &raw)?);
        }

        if let Some(raw) = lookup("GATEWAY_AGENT_TIMEOUT_MS") {
            self.agent_timeout_ms = Some(parse_number("GATEWAY_AGENT_TIMEOUT_MS", &raw)?);
        }

        if let Some(raw) = lookup("GATEWAY_MAX_PENDING_TURNS") {
            self.max_pending_turns = parse_number("GATEWAY_MAX_PENDING_TURNS", &raw)?;
        }

        Ok(())
    }

    /// Agent deadline, if configured.
    #[must_use]
    pub fn agent_timeout(&self) -> Option<Duration> {
        self.agent_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::traits::AgentError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.max_sessions, None);
        assert_eq!(config.agent_timeout(), None);
        assert_eq!(config.max_pending_turns, DEFAULT_MAX_PENDING_TURNS);
        assert_eq!(
            config.failure_reply.render(&AgentError::EmptyReply.into()),
            DEFAULT_FALLBACK_TEXT
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config = GatewayConfig::from_json(
            r#"{"max_sessions": 8, "failure_reply": {"mode": "detail"}}"#,
        )
        .unwrap();

        assert_eq!(config.max_sessions, Some(8));
        assert_eq!(config.failure_reply, FailureReply::Detail);
        assert_eq!(config.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_from_json_apology_without_text() {
        let config =
            GatewayConfig::from_json(r#"{"failure_reply": {"mode": "apology"}}"#).unwrap();

        assert_eq!(config.failure_reply, FailureReply::default());
        assert_eq!(
            config.failure_reply.render(&AgentError::EmptyReply.into()),
            DEFAULT_FALLBACK_TEXT
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            GatewayConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(lookup(&[
                ("GATEWAY_GREETING", "Hi!"),
                ("GATEWAY_FALLBACK_TEXT", "Oops."),
                ("GATEWAY_MAX_SESSIONS", "100"),
                ("GATEWAY_AGENT_TIMEOUT_MS", "2500"),
                ("GATEWAY_MAX_PENDING_TURNS", "4"),
            ]))
            .unwrap();

        assert_eq!(config.greeting, "Hi!");
        assert_eq!(config.max_sessions, Some(100));
        assert_eq!(config.agent_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.max_pending_turns, 4);
        assert_eq!(config.failure_reply.render(&AgentError::EmptyReply.into()), "Oops.");
    }

    #[test]
    fn test_env_detail_mode() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(lookup(&[("GATEWAY_FAILURE_REPLY", "detail")]))
            .unwrap();

        let text = config
            .failure_reply
            .render(&AgentError::Failed("model offline".into()).into());
        assert_eq!(
            text,
            "Sorry, something went wrong: agent call failed: model offline"
        );
    }

    #[test]
    fn test_env_invalid_values() {
        let mut config = GatewayConfig::default();
        let err = config
            .apply_env(lookup(&[("GATEWAY_MAX_SESSIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "GATEWAY_MAX_SESSIONS",
                ..
            }
        ));

        let err = config
            .apply_env(lookup(&[("GATEWAY_FAILURE_REPLY", "shout")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "GATEWAY_FAILURE_REPLY",
                ..
            }
        ));
    }
}
