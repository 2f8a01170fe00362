#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod checkpoint;
mod error;
mod memory;
mod store;

#[doc(hidden)]
pub mod prelude;

pub use checkpoint::ExecutionCheckpoint;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::ExecutionStore;

/// Tracing target for store operations.
pub const TRACING_TARGET: &str = "weft_store";
