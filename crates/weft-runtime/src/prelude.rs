//! Prelude module for convenient imports.
//!
//! ```rust
//! use weft_runtime::prelude::*;
//! ```

pub use crate::compile::{ExecutableGraph, GraphCompiler, ValidationCode, ValidationError};
pub use crate::definition::{Canvas, Edge, Node, NodeConfig};
pub use crate::engine::{Engine, EngineConfig, ExecutionContext};
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::event::{BroadcastSink, EventSink, ExecutionEvent, NoopSink};
pub use crate::provider::{
    AgentRunner, ScriptedAgentRunner, StaticToolRegistry, ToolRegistry,
};
pub use crate::service::{ExecutionStatus, WorkflowService};
pub use crate::value::{EnvelopeMap, ResolveError, VariableResolver};
