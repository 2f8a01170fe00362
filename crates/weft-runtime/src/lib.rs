#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod compile;
pub mod definition;
pub mod engine;
mod error;
pub mod event;
pub mod exec;
pub mod expr;
pub mod provider;
mod service;
pub mod value;

#[doc(hidden)]
pub mod prelude;

pub use error::{WorkflowError, WorkflowResult};
pub use service::{ExecutionStatus, WorkflowService};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "weft_runtime";
