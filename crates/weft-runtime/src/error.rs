//! Workflow error types.

use thiserror::Error;
use weft_core::{ExecutionId, StateError, WorkflowId};
use weft_store::StoreError;

use crate::compile::CompileRejection;
use crate::value::ResolveError;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
///
/// Executor failures never appear here: a tool or agent call that raises
/// is folded into that node's envelope and halts its downstream, it does
/// not unwind the engine. What remains are the caller-facing classes:
/// structural rejection before any side effect, persistence loss, and
/// lifecycle conflicts.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The canvas failed structural validation.
    #[error(transparent)]
    Validation(#[from] CompileRejection),

    /// The stored canvas document could not be parsed.
    #[error("canvas {workflow_id} is malformed: {source}")]
    MalformedCanvas {
        /// Canvas that failed to parse.
        workflow_id: WorkflowId,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A variable path could not be dereferenced outside node execution.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A state transition was rejected.
    #[error(transparent)]
    State(#[from] StateError),

    /// The persistence layer failed; the run cannot safely continue.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The execution is already terminal.
    #[error("execution {0} is already finished")]
    Conflict(ExecutionId),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
