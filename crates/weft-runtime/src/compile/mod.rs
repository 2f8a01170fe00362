//! Canvas compilation.
//!
//! Turns canonical nodes and edges into an executable directed graph:
//! structural defects are collected (all of them, not fail-fast) before
//! any side effect runs, executors are selected per node kind, and a
//! deterministic topological visit order is computed so identical graphs
//! replay identically.

mod compiler;
mod graph;
mod validation;

pub use compiler::GraphCompiler;
pub use graph::{EdgeData, ExecutableGraph};
pub use validation::{CompileRejection, Severity, ValidationCode, ValidationError};
