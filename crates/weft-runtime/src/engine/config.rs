//! Engine configuration.

use std::time::Duration;

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of executions driven concurrently.
    pub max_concurrent_runs: usize,
    /// Deadline for a single node's collaborator call.
    pub node_timeout: Duration,
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_concurrent_runs: 8,
            node_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the maximum number of concurrent runs.
    #[must_use]
    pub fn with_max_concurrent_runs(mut self, max: usize) -> Self {
        self.max_concurrent_runs = max;
        self
    }

    /// Sets the per-node collaborator deadline.
    #[must_use]
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
