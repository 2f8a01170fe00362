//! The executable graph.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use weft_core::NodeId;

use super::validation::ValidationError;
use crate::exec::CompiledNode;

/// Edge payload carried into the compiled graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    /// Optional branch label copied from the authored edge.
    pub label: Option<String>,
}

impl EdgeData {
    /// Returns the branch this edge follows out of a conditional source:
    /// `true` unless explicitly labeled `"false"`.
    pub fn branch(&self) -> bool {
        !matches!(self.label.as_deref(), Some("false"))
    }
}

/// A compiled canvas ready for execution.
///
/// Wraps the petgraph structure with id↔index maps, the precomputed
/// entrypoints/exits, the deterministic topological visit order, and any
/// non-fatal validation warnings.
pub struct ExecutableGraph {
    graph: DiGraph<CompiledNode, EdgeData>,
    node_indices: HashMap<NodeId, NodeIndex>,
    index_to_id: HashMap<NodeIndex, NodeId>,
    order: Vec<NodeId>,
    entrypoints: Vec<NodeId>,
    exits: Vec<NodeId>,
    warnings: Vec<ValidationError>,
}

impl ExecutableGraph {
    /// Assembles a compiled graph. Called by the compiler only.
    pub(crate) fn new(
        graph: DiGraph<CompiledNode, EdgeData>,
        node_indices: HashMap<NodeId, NodeIndex>,
        order: Vec<NodeId>,
        entrypoints: Vec<NodeId>,
        exits: Vec<NodeId>,
        warnings: Vec<ValidationError>,
    ) -> Self {
        let index_to_id = node_indices.iter().map(|(k, v)| (*v, k.clone())).collect();
        Self {
            graph,
            node_indices,
            index_to_id,
            order,
            entrypoints,
            exits,
            warnings,
        }
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&CompiledNode> {
        self.node_indices
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Returns the deterministic topological visit order.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the entrypoints (nodes with no incoming edge), in
    /// authoring order.
    pub fn entrypoints(&self) -> &[NodeId] {
        &self.entrypoints
    }

    /// Returns the exits (nodes with no outgoing edge), in authoring
    /// order.
    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    /// Returns whether the node is an entrypoint.
    pub fn is_entrypoint(&self, id: &NodeId) -> bool {
        self.entrypoints.contains(id)
    }

    /// Returns non-fatal validation findings.
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Returns the predecessors of a node.
    pub fn predecessors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Returns the successors of a node.
    pub fn successors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &NodeId, direction: Direction) -> impl Iterator<Item = &NodeId> {
        self.node_indices.get(id).into_iter().flat_map(move |&idx| {
            self.graph
                .neighbors_directed(idx, direction)
                .filter_map(|n| self.index_to_id.get(&n))
        })
    }

    /// Returns the incoming edges of a node as `(source, edge)` pairs.
    pub fn edges_into(&self, id: &NodeId) -> Vec<(&NodeId, &EdgeData)> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|edge| {
                use petgraph::visit::EdgeRef;
                self.index_to_id
                    .get(&edge.source())
                    .map(|source| (source, edge.weight()))
            })
            .collect()
    }

    /// Returns every transitive successor of a node.
    ///
    /// This is the set the orchestrator halts when the node fails.
    pub fn descendants(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let Some(&start) = self.node_indices.get(id) else {
            return seen;
        };
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if let Some(next_id) = self.index_to_id.get(&next) {
                    if seen.insert(next_id.clone()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }
}

impl std::fmt::Debug for ExecutableGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableGraph")
            .field("node_count", &self.graph.node_count())
            .field("edge_count", &self.graph.edge_count())
            .field("order", &self.order)
            .field("entrypoints", &self.entrypoints)
            .field("exits", &self.exits)
            .finish()
    }
}
