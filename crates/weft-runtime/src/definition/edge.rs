//! Edge types for connecting nodes in a canvas.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use weft_core::NodeId;

/// An edge connecting two nodes.
///
/// Labels gate conditional branches: edges out of a conditional node
/// labeled `"true"`/`"false"` are followed only when the condition
/// evaluated that way. Unlabeled edges follow the `true` branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
#[builder(
    name = "EdgeBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct Edge {
    /// Source node id. Legacy documents call this `source`.
    #[serde(alias = "source", alias = "from_node_id")]
    pub from: NodeId,
    /// Target node id. Legacy documents call this `target`.
    #[serde(alias = "target", alias = "to_node_id")]
    pub to: NodeId,
    /// Optional branch label. Legacy documents call this `branch`.
    #[serde(default, alias = "branch", skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub label: Option<String>,
}

impl EdgeBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.from.is_none() {
            return Err("from is required".into());
        }
        if self.to.is_none() {
            return Err("to is required".into());
        }
        Ok(())
    }
}

impl Edge {
    /// Creates a new unlabeled edge between two nodes.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }

    /// Creates a labeled edge between two nodes.
    pub fn labeled(
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: Some(label.into()),
        }
    }

    /// Returns a builder for creating an edge.
    pub fn builder() -> EdgeBuilder {
        EdgeBuilder::default()
    }

    /// Returns the branch this edge follows out of a conditional source:
    /// `true` for `"true"`-labeled and unlabeled edges, `false` for
    /// `"false"`-labeled ones.
    pub fn branch(&self) -> bool {
        !matches!(self.label.as_deref(), Some("false"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_edge_builder_requires_endpoints() {
        let err = Edge::builder().with_from("a").build().unwrap_err();
        assert!(err.to_string().contains("to is required"));
    }

    #[test]
    fn test_legacy_field_aliases() {
        let edge: Edge = serde_json::from_value(json!({
            "source": "gate", "target": "reply", "branch": "false"
        }))
        .unwrap();
        assert_eq!(edge.from, NodeId::from("gate"));
        assert_eq!(edge.to, NodeId::from("reply"));
        assert!(!edge.branch());
    }

    #[test]
    fn test_unlabeled_edge_follows_true_branch() {
        assert!(Edge::new("a", "b").branch());
        assert!(Edge::labeled("a", "b", "true").branch());
        assert!(!Edge::labeled("a", "b", "false").branch());
    }
}
