//! Tool node configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration of a tool node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Name of the tool in the registry.
    pub tool: String,
    /// Static parameters passed to the tool. String values may embed
    /// `${...}` references resolved against prior node envelopes.
    #[serde(default, alias = "params", skip_serializing_if = "Map::is_empty")]
    pub static_params: Map<String, Value>,
}

impl ToolDef {
    /// Creates a tool configuration with no parameters.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            static_params: Map::new(),
        }
    }

    /// Adds a static parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.static_params.insert(key.into(), value);
        self
    }
}
