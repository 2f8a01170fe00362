//! Agent node executor.

use std::sync::Arc;

use serde_json::json;
use weft_core::{FailureKind, NodeKind, NodeOutputEnvelope};

use super::{ExecOutcome, NodeContext};
use crate::provider::AgentRunner;
use crate::value::VariableResolver;

/// Executes agent nodes.
///
/// The message template is interpolated against prior envelopes, the turn
/// is delegated to the agent runner under the node deadline, and the
/// produced reply is folded into the envelope value.
pub struct AgentExecutor {
    agent: String,
    message: String,
    runner: Arc<dyn AgentRunner>,
}

impl AgentExecutor {
    /// Creates an executor bound to a runner.
    pub fn new(
        agent: impl Into<String>,
        message: impl Into<String>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            agent: agent.into(),
            message: message.into(),
            runner,
        }
    }

    /// Returns the agent id.
    pub fn agent_id(&self) -> &str {
        &self.agent
    }

    /// Interpolates the message, runs the turn, and wraps the reply.
    pub async fn execute(&self, ctx: NodeContext<'_>) -> ExecOutcome {
        let resolver = VariableResolver::new(ctx.envelopes);
        // Interpolation never fails a template; unresolved references
        // stay literal and are logged by the resolver.
        let message = resolver.interpolate(&self.message);

        let turn = self.runner.run(&self.agent, &message);
        match tokio::time::timeout(ctx.timeout, turn).await {
            Err(_elapsed) => ExecOutcome::failure(
                NodeOutputEnvelope::failure(
                    NodeKind::Agent,
                    serde_json::Value::Null,
                    format!(
                        "agent `{}` timed out after {}s",
                        self.agent,
                        ctx.timeout.as_secs()
                    ),
                ),
                FailureKind::Timeout,
            ),
            Ok(Err(error)) => ExecOutcome::failure(
                NodeOutputEnvelope::failure(
                    NodeKind::Agent,
                    serde_json::Value::Null,
                    error.to_string(),
                ),
                FailureKind::NodeFailed,
            ),
            Ok(Ok(reply)) => ExecOutcome::success(NodeOutputEnvelope::success(
                NodeKind::Agent,
                json!({ "reply": reply }),
            )),
        }
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("agent", &self.agent)
            .field("message", &self.message)
            .finish()
    }
}
