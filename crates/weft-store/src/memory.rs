//! In-process store implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use weft_core::{ExecutionId, NodeExecutionState, NodeId, WorkflowExecution, WorkflowId};

use crate::TRACING_TARGET;
use crate::checkpoint::ExecutionCheckpoint;
use crate::error::{StoreError, StoreResult};
use crate::store::ExecutionStore;

/// In-memory [`ExecutionStore`] for tests and single-process deployments.
///
/// Enforces the record invariants at the write boundary: records failing
/// the validity predicate are rejected, and finished records are
/// immutable. `fail_writes` simulates an unavailable backing store so the
/// engine-fatal path is testable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    canvases: RwLock<HashMap<WorkflowId, Value>>,
    executions: RwLock<HashMap<ExecutionId, WorkflowExecution>>,
    node_states: RwLock<HashMap<ExecutionId, Vec<NodeExecutionState>>>,
    checkpoints: RwLock<HashMap<ExecutionId, ExecutionCheckpoint>>,
    writes_failing: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, failing: bool) {
        self.writes_failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.writes_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> StoreResult<std::sync::RwLockReadGuard<'a, T>> {
        lock.read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write<'a, T>(
        &self,
        lock: &'a RwLock<T>,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'a, T>> {
        lock.write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn validate_execution(execution: &WorkflowExecution) -> StoreResult<()> {
        if !execution.is_valid() {
            return Err(StoreError::InvalidRecord(format!(
                "execution {} fails the state predicate",
                execution.id
            )));
        }
        Ok(())
    }

    fn validate_node_state(state: &NodeExecutionState) -> StoreResult<()> {
        if !state.is_valid() {
            return Err(StoreError::InvalidRecord(format!(
                "node state {}/{} fails the state predicate",
                state.execution_id, state.node_id
            )));
        }
        Ok(())
    }

    fn upsert_node_state_inner(&self, state: NodeExecutionState) -> StoreResult<()> {
        Self::validate_node_state(&state)?;
        let mut states = self.write(&self.node_states)?;
        let rows = states.entry(state.execution_id).or_default();
        match rows.iter_mut().find(|r| r.node_id == state.node_id) {
            Some(existing) => {
                if existing.is_finished() {
                    return Err(StoreError::FinishedRecordImmutable {
                        id: format!("{}/{}", state.execution_id, state.node_id),
                    });
                }
                *existing = state;
            }
            None => rows.push(state),
        }
        Ok(())
    }

    fn save_checkpoint_inner(&self, checkpoint: ExecutionCheckpoint) -> StoreResult<()> {
        let mut checkpoints = self.write(&self.checkpoints)?;
        checkpoints.insert(checkpoint.execution_id, checkpoint);
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn put_canvas(&self, id: WorkflowId, document: Value) -> StoreResult<()> {
        self.check_available()?;
        let mut canvases = self.write(&self.canvases)?;
        canvases.insert(id, document);
        Ok(())
    }

    async fn get_canvas(&self, id: WorkflowId) -> StoreResult<Value> {
        let canvases = self.read(&self.canvases)?;
        canvases
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("canvas", id))
    }

    async fn create_execution(&self, execution: WorkflowExecution) -> StoreResult<()> {
        self.check_available()?;
        Self::validate_execution(&execution)?;
        let mut executions = self.write(&self.executions)?;
        executions.insert(execution.id, execution);
        Ok(())
    }

    async fn get_execution(&self, id: ExecutionId) -> StoreResult<WorkflowExecution> {
        let executions = self.read(&self.executions)?;
        executions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("execution", id))
    }

    async fn update_execution(&self, execution: WorkflowExecution) -> StoreResult<()> {
        self.check_available()?;
        Self::validate_execution(&execution)?;
        let mut executions = self.write(&self.executions)?;
        let Some(existing) = executions.get_mut(&execution.id) else {
            return Err(StoreError::not_found("execution", execution.id));
        };
        if existing.is_finished() {
            return Err(StoreError::FinishedRecordImmutable {
                id: execution.id.to_string(),
            });
        }
        *existing = execution;
        Ok(())
    }

    async fn upsert_node_state(&self, state: NodeExecutionState) -> StoreResult<()> {
        self.check_available()?;
        self.upsert_node_state_inner(state)
    }

    async fn get_node_state(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
    ) -> StoreResult<NodeExecutionState> {
        let states = self.read(&self.node_states)?;
        states
            .get(&execution_id)
            .and_then(|rows| rows.iter().find(|r| &r.node_id == node_id))
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found("node state", format!("{execution_id}/{node_id}"))
            })
    }

    async fn list_node_states(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Vec<NodeExecutionState>> {
        let states = self.read(&self.node_states)?;
        Ok(states.get(&execution_id).cloned().unwrap_or_default())
    }

    async fn record_node_transition(
        &self,
        state: NodeExecutionState,
        checkpoint: ExecutionCheckpoint,
    ) -> StoreResult<()> {
        self.check_available()?;
        // The node row is validated before any write, so a rejected pair
        // leaves no partial state behind.
        self.upsert_node_state_inner(state)?;
        self.save_checkpoint_inner(checkpoint)?;
        Ok(())
    }

    async fn save_checkpoint(&self, checkpoint: ExecutionCheckpoint) -> StoreResult<()> {
        self.check_available()?;
        self.save_checkpoint_inner(checkpoint)
    }

    async fn load_checkpoint(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Option<ExecutionCheckpoint>> {
        let checkpoints = self.read(&self.checkpoints)?;
        Ok(checkpoints.get(&execution_id).cloned())
    }

    async fn delete_checkpoint(&self, execution_id: ExecutionId) -> StoreResult<()> {
        self.check_available()?;
        let mut checkpoints = self.write(&self.checkpoints)?;
        if checkpoints.remove(&execution_id).is_none() {
            tracing::debug!(
                target: TRACING_TARGET,
                execution_id = %execution_id,
                "No checkpoint to delete"
            );
        }
        Ok(())
    }
}
