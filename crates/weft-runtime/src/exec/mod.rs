//! Node executors.
//!
//! One execution strategy per node kind, selected once at compile time:
//! the orchestrator dispatches over this closed enum and never branches
//! on a string tag at run time. All executors share the same contract:
//! consume resolved inputs, produce an envelope. Failures are folded into
//! the envelope, never raised.

use std::time::Duration;

use serde_json::Value;
use weft_core::{FailureKind, NodeId, NodeKind, NodeOutputEnvelope};

use crate::value::EnvelopeMap;

mod agent;
mod conditional;
mod tool;
mod trigger;

pub use agent::AgentExecutor;
pub use conditional::ConditionalExecutor;
pub use tool::ToolExecutor;
pub use trigger::TriggerExecutor;

/// Inputs handed to an executor for one node visit.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// The node being executed.
    pub node_id: &'a NodeId,
    /// Envelopes produced by already-visited nodes.
    pub envelopes: &'a EnvelopeMap,
    /// Payload supplied at `start` for trigger nodes.
    pub trigger_payload: Option<&'a Value>,
    /// Deadline for collaborator calls made by this node.
    pub timeout: Duration,
}

/// What one node visit produced.
///
/// The envelope is the node's output per the universal contract; the
/// failure kind classifies a failed visit for the execution record and is
/// `None` exactly when the envelope succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    /// The produced envelope.
    pub envelope: NodeOutputEnvelope,
    /// Classification of the failure, if the node failed.
    pub failure_kind: Option<FailureKind>,
}

impl ExecOutcome {
    /// Wraps a successful envelope.
    pub fn success(envelope: NodeOutputEnvelope) -> Self {
        Self {
            envelope,
            failure_kind: None,
        }
    }

    /// Wraps a failed envelope with its classification.
    pub fn failure(envelope: NodeOutputEnvelope, kind: FailureKind) -> Self {
        Self {
            envelope,
            failure_kind: Some(kind),
        }
    }

    /// Returns whether the visit failed.
    pub fn is_failure(&self) -> bool {
        self.failure_kind.is_some()
    }
}

/// A node compiled into its execution strategy.
#[derive(Debug)]
pub enum CompiledNode {
    /// Pass-through seeding the entrypoint.
    Trigger(TriggerExecutor),
    /// Tool invocation through the registry.
    Tool(ToolExecutor),
    /// Delegated agent turn.
    Agent(AgentExecutor),
    /// Condition evaluation selecting outgoing branches.
    Conditional(ConditionalExecutor),
}

impl CompiledNode {
    /// Returns the kind tag of the compiled node.
    pub const fn kind(&self) -> NodeKind {
        match self {
            CompiledNode::Trigger(_) => NodeKind::Trigger,
            CompiledNode::Tool(_) => NodeKind::Tool,
            CompiledNode::Agent(_) => NodeKind::Agent,
            CompiledNode::Conditional(_) => NodeKind::Conditional,
        }
    }

    /// Executes the node against the given context.
    pub async fn execute(&self, ctx: NodeContext<'_>) -> ExecOutcome {
        match self {
            CompiledNode::Trigger(executor) => executor.execute(ctx),
            CompiledNode::Tool(executor) => executor.execute(ctx).await,
            CompiledNode::Agent(executor) => executor.execute(ctx).await,
            CompiledNode::Conditional(executor) => executor.execute(ctx),
        }
    }
}
