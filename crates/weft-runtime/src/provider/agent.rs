//! Agent runner contract.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by delegated agent turns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentRunError {
    /// No agent with that id is known.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The agent turn raised.
    #[error("agent {agent} failed: {message}")]
    Failed {
        /// Id of the failing agent.
        agent: String,
        /// Error surfaced by the turn.
        message: String,
    },
}

/// Runner of delegated agent turns.
///
/// `run` may internally spawn an isolated sub-agent through the
/// supervisor/worker subsystem; that machinery is opaque to the engine,
/// which only sees the final reply text.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Returns whether an agent with the given id is known.
    fn knows(&self, agent_id: &str) -> bool;

    /// Runs one agent turn with the given message.
    async fn run(&self, agent_id: &str, message: &str) -> Result<String, AgentRunError>;
}

/// Reply to hand out for a scripted agent.
#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail(String),
}

/// In-process [`AgentRunner`] with canned replies.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgentRunner {
    scripts: HashMap<String, Script>,
}

impl ScriptedAgentRunner {
    /// Creates an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a reply for an agent.
    pub fn reply(mut self, agent_id: impl Into<String>, reply: impl Into<String>) -> Self {
        self.scripts
            .insert(agent_id.into(), Script::Reply(reply.into()));
        self
    }

    /// Scripts a failure for an agent.
    pub fn fail(mut self, agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts
            .insert(agent_id.into(), Script::Fail(message.into()));
        self
    }
}

#[async_trait]
impl AgentRunner for ScriptedAgentRunner {
    fn knows(&self, agent_id: &str) -> bool {
        self.scripts.contains_key(agent_id)
    }

    async fn run(&self, agent_id: &str, _message: &str) -> Result<String, AgentRunError> {
        match self.scripts.get(agent_id) {
            Some(Script::Reply(reply)) => Ok(reply.clone()),
            Some(Script::Fail(message)) => Err(AgentRunError::Failed {
                agent: agent_id.to_owned(),
                message: message.clone(),
            }),
            None => Err(AgentRunError::UnknownAgent(agent_id.to_owned())),
        }
    }
}
