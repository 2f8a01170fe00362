//! Execution context.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use weft_core::{ExecutionId, NodeId, NodeOutputEnvelope, WorkflowId};
use weft_store::ExecutionCheckpoint;

use crate::value::EnvelopeMap;

/// In-memory state of one run.
///
/// Wraps the execution's checkpoint (completed nodes and their
/// envelopes) together with the run's cancellation token. The checkpoint
/// is the persisted shape; resuming after a restart is loading it back
/// into a fresh context.
#[derive(Debug)]
pub struct ExecutionContext {
    checkpoint: ExecutionCheckpoint,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Creates a fresh context for a new run.
    pub fn new(
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        trigger_payload: Option<Value>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            checkpoint: ExecutionCheckpoint::new(execution_id, workflow_id)
                .with_trigger_payload(trigger_payload),
            cancellation,
        }
    }

    /// Rebuilds a context from a persisted checkpoint.
    pub fn from_checkpoint(
        checkpoint: ExecutionCheckpoint,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            checkpoint,
            cancellation,
        }
    }

    /// Returns the execution id.
    pub fn execution_id(&self) -> ExecutionId {
        self.checkpoint.execution_id
    }

    /// Returns the workflow id.
    pub fn workflow_id(&self) -> WorkflowId {
        self.checkpoint.workflow_id
    }

    /// Returns the run's trigger payload, if any.
    pub fn trigger_payload(&self) -> Option<&Value> {
        self.checkpoint.trigger_payload.as_ref()
    }

    /// Returns the envelopes produced so far.
    pub fn envelopes(&self) -> &EnvelopeMap {
        &self.checkpoint.envelopes
    }

    /// Returns whether the node already completed (possibly before a
    /// restart).
    pub fn is_completed(&self, node_id: &NodeId) -> bool {
        self.checkpoint.is_completed(node_id)
    }

    /// Records a completed node.
    pub fn record(&mut self, node_id: NodeId, envelope: NodeOutputEnvelope) {
        self.checkpoint.record(node_id, envelope);
    }

    /// Returns the current checkpoint snapshot.
    pub fn checkpoint(&self) -> &ExecutionCheckpoint {
        &self.checkpoint
    }

    /// Returns the run's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
