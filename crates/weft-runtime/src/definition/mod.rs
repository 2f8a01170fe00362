//! Canvas definition types.
//!
//! This module contains the serializable, editor-friendly types for
//! authored workflows. Historically the editor produced several divergent
//! document shapes; deserialization normalizes all of them into the one
//! canonical node/edge representation the compiler consumes.
//!
//! To execute a canvas, it must be compiled into an executable graph by
//! the [`crate::compile::GraphCompiler`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_core::{NodeId, WorkflowId};

mod agent;
mod conditional;
mod edge;
mod metadata;
mod node;
mod tool;
mod trigger;
mod util;

pub use agent::AgentDef;
pub use conditional::ConditionalDef;
pub use edge::{Edge, EdgeBuilder};
pub use metadata::CanvasMetadata;
pub use node::{Node, NodeBuilder, NodeConfig};
pub use tool::ToolDef;
pub use trigger::TriggerDef;
pub use util::Position;

use crate::error::{WorkflowError, WorkflowResult};

/// A named, versioned canvas document owned by a user.
///
/// Nodes are an ordered sequence (authoring order is the tie-break for
/// the compiler's deterministic topological order), while edges are an
/// unordered set. Saves replace the document wholesale; there are no
/// partial patch semantics at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    /// Unique identifier of the canvas.
    pub id: WorkflowId,
    /// Display name.
    pub name: String,
    /// Owning user, if known at this layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Nodes in authoring order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges connecting nodes. Legacy documents call these `connections`.
    #[serde(default, alias = "connections")]
    pub edges: Vec<Edge>,
    /// Canvas metadata.
    #[serde(default)]
    pub metadata: CanvasMetadata,
}

impl Canvas {
    /// Creates an empty canvas with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            owner: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: CanvasMetadata::default(),
        }
    }

    /// Parses a stored canvas document, normalizing legacy shapes.
    ///
    /// This is the single entry point the CRUD surface and the engine use
    /// to turn persisted JSON into the canonical representation.
    pub fn from_json(workflow_id: WorkflowId, document: Value) -> WorkflowResult<Self> {
        serde_json::from_value(document).map_err(|source| WorkflowError::MalformedCanvas {
            workflow_id,
            source,
        })
    }

    /// Returns the node with the given id, if present.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Appends a node.
    pub fn push_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge.
    pub fn push_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }
}
