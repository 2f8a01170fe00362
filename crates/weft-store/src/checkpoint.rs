//! Restart checkpoints.
//!
//! A checkpoint is an explicit snapshot of an execution's progress
//! (which nodes completed and the envelopes they produced), persisted
//! transactionally with each node-state transition. It is the only state
//! shared across process boundaries; resumability lives here, not inside
//! the graph-traversal structures.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_core::{ExecutionId, NodeId, NodeOutputEnvelope, WorkflowId};

/// Snapshot of an execution's progress, keyed by execution id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCheckpoint {
    /// The execution this checkpoint belongs to.
    pub execution_id: ExecutionId,
    /// The workflow the execution runs.
    pub workflow_id: WorkflowId,
    /// Payload the run was started with, for trigger nodes not yet
    /// visited at snapshot time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_payload: Option<Value>,
    /// Node ids that finished, in visit order.
    pub completed: Vec<NodeId>,
    /// Envelopes produced by the completed nodes.
    pub envelopes: HashMap<NodeId, NodeOutputEnvelope>,
    /// When the checkpoint was last advanced.
    pub updated_at: Timestamp,
}

impl ExecutionCheckpoint {
    /// Creates an empty checkpoint for a fresh execution.
    pub fn new(execution_id: ExecutionId, workflow_id: WorkflowId) -> Self {
        Self {
            execution_id,
            workflow_id,
            trigger_payload: None,
            completed: Vec::new(),
            envelopes: HashMap::new(),
            updated_at: Timestamp::now(),
        }
    }

    /// Attaches the run's trigger payload.
    pub fn with_trigger_payload(mut self, payload: Option<Value>) -> Self {
        self.trigger_payload = payload;
        self
    }

    /// Records a completed node and its envelope.
    pub fn record(&mut self, node_id: NodeId, envelope: NodeOutputEnvelope) {
        if !self.completed.contains(&node_id) {
            self.completed.push(node_id.clone());
        }
        self.envelopes.insert(node_id, envelope);
        self.updated_at = Timestamp::now();
    }

    /// Returns whether the given node already completed.
    pub fn is_completed(&self, node_id: &NodeId) -> bool {
        self.envelopes.contains_key(node_id)
    }

    /// Returns the number of completed nodes.
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Returns whether no node has completed yet.
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use weft_core::NodeKind;

    use super::*;

    #[test]
    fn test_record_preserves_visit_order() {
        let mut cp = ExecutionCheckpoint::new(ExecutionId::new(), WorkflowId::new());
        cp.record(
            NodeId::from("a"),
            NodeOutputEnvelope::success(NodeKind::Trigger, json!(null)),
        );
        cp.record(
            NodeId::from("b"),
            NodeOutputEnvelope::success(NodeKind::Tool, json!(1)),
        );
        assert_eq!(cp.completed, vec![NodeId::from("a"), NodeId::from("b")]);
        assert!(cp.is_completed(&NodeId::from("a")));
        assert!(!cp.is_completed(&NodeId::from("c")));
    }

    #[test]
    fn test_re_recording_a_node_does_not_duplicate() {
        let mut cp = ExecutionCheckpoint::new(ExecutionId::new(), WorkflowId::new());
        let env = NodeOutputEnvelope::success(NodeKind::Tool, json!(1));
        cp.record(NodeId::from("a"), env.clone());
        cp.record(NodeId::from("a"), env);
        assert_eq!(cp.len(), 1);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut cp = ExecutionCheckpoint::new(ExecutionId::new(), WorkflowId::new());
        cp.record(
            NodeId::from("a"),
            NodeOutputEnvelope::success(NodeKind::Agent, json!({"reply": "hi"})),
        );
        let json = serde_json::to_string(&cp).unwrap();
        let back: ExecutionCheckpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(cp, back);
    }
}
