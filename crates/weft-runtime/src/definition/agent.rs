//! Agent node configuration.

use serde::{Deserialize, Serialize};

/// Configuration of an agent node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDef {
    /// Identifier of the agent in the agent runner.
    pub agent: String,
    /// Message template sent to the agent; `${...}` references are
    /// interpolated against prior node envelopes.
    pub message: String,
}

impl AgentDef {
    /// Creates an agent configuration.
    pub fn new(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            message: message.into(),
        }
    }
}
