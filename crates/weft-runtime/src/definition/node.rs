//! Node definition types.

use derive_builder::Builder;
use derive_more::From;
use serde::{Deserialize, Serialize};
use weft_core::{NodeId, NodeKind};

use super::agent::AgentDef;
use super::conditional::ConditionalDef;
use super::tool::ToolDef;
use super::trigger::TriggerDef;
use super::util::Position;

/// An authored workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "NodeBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct Node {
    /// Identifier, unique within the canvas.
    pub id: NodeId,
    /// Kind-specific configuration, flattened into the node document.
    #[serde(flatten)]
    pub config: NodeConfig,
    /// Position in the visual editor; irrelevant to execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub position: Option<Position>,
}

impl NodeBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.id {
            None => Err("id is required".into()),
            Some(id) if id.as_str().is_empty() => Err("id must not be empty".into()),
            Some(_) => Ok(()),
        }
    }
}

impl Node {
    /// Creates a new node with the given id and configuration.
    pub fn new(id: impl Into<NodeId>, config: impl Into<NodeConfig>) -> Self {
        Self {
            id: id.into(),
            config: config.into(),
            position: None,
        }
    }

    /// Returns a builder for creating a node.
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Returns the node's kind tag.
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

/// Kind-specific node configuration.
///
/// A closed tagged union: one variant per node kind the engine can
/// execute, selected once at compile time. The aliases absorb the legacy
/// kind spellings older editors produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    /// Entry point seeding the run with a payload.
    Trigger(TriggerDef),
    /// Invocation of a registered tool.
    Tool(ToolDef),
    /// Delegated agent turn.
    #[serde(alias = "llm")]
    Agent(AgentDef),
    /// Conditional branch over a restricted expression.
    #[serde(alias = "if", alias = "condition")]
    Conditional(ConditionalDef),
}

impl NodeConfig {
    /// Returns the kind tag for this configuration.
    pub const fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Trigger(_) => NodeKind::Trigger,
            NodeConfig::Tool(_) => NodeKind::Tool,
            NodeConfig::Agent(_) => NodeKind::Agent,
            NodeConfig::Conditional(_) => NodeKind::Conditional,
        }
    }

    /// Returns whether this is a trigger configuration.
    pub const fn is_trigger(&self) -> bool {
        matches!(self, NodeConfig::Trigger(_))
    }

    /// Returns whether this is a conditional configuration.
    pub const fn is_conditional(&self) -> bool {
        matches!(self, NodeConfig::Conditional(_))
    }
}
