//! Prelude module for convenient imports.
//!
//! ```rust
//! use weft_core::prelude::*;
//! ```

pub use crate::envelope::{EnvelopeMeta, NodeOutputEnvelope};
pub use crate::error::{StateError, StateResult};
pub use crate::id::{ExecutionId, NodeId, WorkflowId};
pub use crate::kind::{NodeKind, TriggerKind};
pub use crate::state::{
    ExecutionPhase, ExecutionResult, FailureKind, NodeExecutionState, WorkflowExecution,
    validate_state,
};
