//! The persistence contract the engine drives.

use async_trait::async_trait;
use serde_json::Value;
use weft_core::{ExecutionId, NodeExecutionState, NodeId, WorkflowExecution, WorkflowId};

use crate::checkpoint::ExecutionCheckpoint;
use crate::error::StoreResult;

/// Create/read/update contract for the engine's durable records.
///
/// Canvas documents are stored as raw JSON: the runtime owns parsing and
/// normalization, the store owns bytes. Execution and node-state records
/// are typed because the store enforces their validity invariants at the
/// write boundary.
///
/// Implementations must make [`record_node_transition`] atomic: the
/// node-state write and its checkpoint land together or not at all, so a
/// process restart never observes one without the other.
///
/// [`record_node_transition`]: ExecutionStore::record_node_transition
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Stores (or replaces wholesale) a canvas document.
    async fn put_canvas(&self, id: WorkflowId, document: Value) -> StoreResult<()>;

    /// Loads a canvas document.
    async fn get_canvas(&self, id: WorkflowId) -> StoreResult<Value>;

    /// Creates a new execution record.
    async fn create_execution(&self, execution: WorkflowExecution) -> StoreResult<()>;

    /// Loads an execution record.
    async fn get_execution(&self, id: ExecutionId) -> StoreResult<WorkflowExecution>;

    /// Persists an execution state transition.
    async fn update_execution(&self, execution: WorkflowExecution) -> StoreResult<()>;

    /// Creates or updates a node-state record.
    async fn upsert_node_state(&self, state: NodeExecutionState) -> StoreResult<()>;

    /// Loads one node-state record.
    async fn get_node_state(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
    ) -> StoreResult<NodeExecutionState>;

    /// Lists all node-state records of an execution, in visit order.
    async fn list_node_states(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Vec<NodeExecutionState>>;

    /// Persists a node-state transition and its checkpoint as one atomic
    /// step.
    async fn record_node_transition(
        &self,
        state: NodeExecutionState,
        checkpoint: ExecutionCheckpoint,
    ) -> StoreResult<()>;

    /// Saves a checkpoint on its own (used for the initial snapshot).
    async fn save_checkpoint(&self, checkpoint: ExecutionCheckpoint) -> StoreResult<()>;

    /// Loads the checkpoint of an execution, if one exists.
    async fn load_checkpoint(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Option<ExecutionCheckpoint>>;

    /// Removes the checkpoint of a finished execution.
    async fn delete_checkpoint(&self, execution_id: ExecutionId) -> StoreResult<()>;
}
