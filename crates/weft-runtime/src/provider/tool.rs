//! Tool registry contract.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolInvokeError {
    /// No tool with that name is registered.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The tool ran and raised.
    #[error("tool {tool} failed: {message}")]
    Failed {
        /// Name of the failing tool.
        tool: String,
        /// Error surfaced by the tool.
        message: String,
    },
}

/// Registry of invocable tools.
///
/// `contains` backs compile-time name validation; `invoke` is the
/// execution-time call. Implementations own their transport (HTTP, MCP,
/// in-process); the engine only sees JSON in and JSON out.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Returns whether a tool with the given name is registered.
    fn contains(&self, name: &str) -> bool;

    /// Invokes a tool with resolved parameters.
    async fn invoke(&self, name: &str, params: Value) -> Result<Value, ToolInvokeError>;
}

type ToolFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolInvokeError>> + Send + Sync>;

/// In-process [`ToolRegistry`] mapping names to async closures.
#[derive(Clone, Default)]
pub struct StaticToolRegistry {
    tools: HashMap<String, ToolFn>,
}

impl StaticToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under the given name.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, tool: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolInvokeError>> + Send + 'static,
    {
        self.tools.insert(
            name.into(),
            Arc::new(move |params| -> BoxFuture<'static, Result<Value, ToolInvokeError>> {
                Box::pin(tool(params))
            }),
        );
        self
    }

    /// Returns the registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl ToolRegistry for StaticToolRegistry {
    fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolInvokeError::NotFound(name.to_owned()))?;
        tool(params).await
    }
}

impl std::fmt::Debug for StaticToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToolRegistry")
            .field("tools", &self.tools.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = StaticToolRegistry::new().register("double", |params: Value| async move {
            let n = params["n"].as_i64().unwrap_or(0);
            Ok(json!({"doubled": n * 2}))
        });

        assert!(registry.contains("double"));
        assert!(!registry.contains("triple"));

        let out = registry.invoke("double", json!({"n": 21})).await.unwrap();
        assert_eq!(out, json!({"doubled": 42}));
    }

    #[tokio::test]
    async fn test_unknown_tool_errors() {
        let registry = StaticToolRegistry::new();
        let err = registry.invoke("ghost", json!({})).await.unwrap_err();
        assert_eq!(err, ToolInvokeError::NotFound("ghost".into()));
    }
}
