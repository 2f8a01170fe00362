//! Prelude module for convenient imports.
//!
//! ```rust
//! use weft_store::prelude::*;
//! ```

pub use crate::checkpoint::ExecutionCheckpoint;
pub use crate::error::{StoreError, StoreResult};
pub use crate::memory::MemoryStore;
pub use crate::store::ExecutionStore;
