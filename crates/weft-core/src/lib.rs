#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod envelope;
mod error;
mod id;
mod kind;
mod state;

#[doc(hidden)]
pub mod prelude;

pub use envelope::{EnvelopeMeta, NodeOutputEnvelope};
pub use error::{StateError, StateResult};
pub use id::{ExecutionId, NodeId, WorkflowId};
pub use kind::{NodeKind, TriggerKind};
pub use state::{
    ExecutionPhase, ExecutionResult, FailureKind, NodeExecutionState, WorkflowExecution,
    validate_state,
};
