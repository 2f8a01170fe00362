//! The canvas compiler.
//!
//! Compilation runs in phases:
//!
//! 1. **Validation**: a single pass collecting *all* structural defects
//!    (duplicate ids, dangling edges, unknown tool/agent names, missing
//!    entrypoint, cycles) so the caller can report every defect at once.
//! 2. **Node compilation**: one executor per node kind, selected here so
//!    the orchestrator never branches on a tag at run time.
//! 3. **Graph building**: the petgraph structure plus a deterministic
//!    topological visit order, ties broken by authoring order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use weft_core::NodeId;

use super::graph::{EdgeData, ExecutableGraph};
use super::validation::{CompileRejection, ValidationCode, ValidationError};
use crate::TRACING_TARGET;
use crate::definition::{Canvas, Edge, Node, NodeConfig};
use crate::exec::{
    AgentExecutor, CompiledNode, ConditionalExecutor, ToolExecutor, TriggerExecutor,
};
use crate::provider::{AgentRunner, ToolRegistry};

/// Compiles canvases into executable graphs.
pub struct GraphCompiler {
    tools: Arc<dyn ToolRegistry>,
    agents: Arc<dyn AgentRunner>,
}

impl GraphCompiler {
    /// Creates a compiler validating against the given collaborators.
    pub fn new(tools: Arc<dyn ToolRegistry>, agents: Arc<dyn AgentRunner>) -> Self {
        Self { tools, agents }
    }

    /// Compiles a canvas, returning either an executable graph or every
    /// validation finding discovered.
    pub fn compile(&self, canvas: &Canvas) -> Result<ExecutableGraph, CompileRejection> {
        let mut errors: Vec<ValidationError> = Vec::new();

        if canvas.nodes.is_empty() {
            errors.push(ValidationError::fatal(
                ValidationCode::EmptyCanvas,
                "canvas has no nodes",
            ));
        }

        // Duplicate ids; the first occurrence keeps the authoring slot.
        let mut authoring: HashMap<&NodeId, usize> = HashMap::new();
        let mut unique: Vec<&Node> = Vec::new();
        for node in &canvas.nodes {
            if authoring.contains_key(&node.id) {
                errors.push(
                    ValidationError::fatal(
                        ValidationCode::DuplicateNodeId,
                        format!("node id `{}` appears more than once", node.id),
                    )
                    .with_node(node.id.clone()),
                );
            } else {
                authoring.insert(&node.id, unique.len());
                unique.push(node);
            }
        }

        // Edge endpoints must exist; dangling edges are dropped from the
        // build so the remaining checks still run.
        let mut valid_edges: Vec<&Edge> = Vec::new();
        for edge in &canvas.edges {
            let mut endpoints_ok = true;
            for endpoint in [&edge.from, &edge.to] {
                if !authoring.contains_key(endpoint) {
                    errors.push(
                        ValidationError::fatal(
                            ValidationCode::InvalidEdgeTarget,
                            format!(
                                "edge {} -> {} references missing node `{endpoint}`",
                                edge.from, edge.to
                            ),
                        )
                        .with_node(endpoint.clone()),
                    );
                    endpoints_ok = false;
                }
            }
            if endpoints_ok {
                valid_edges.push(edge);
            }
        }

        // Referenced collaborators must resolve now, not silently at
        // execution time.
        for node in &unique {
            match &node.config {
                NodeConfig::Tool(def) if !self.tools.contains(&def.tool) => {
                    errors.push(
                        ValidationError::fatal(
                            ValidationCode::InvalidToolName,
                            format!("tool `{}` is not registered", def.tool),
                        )
                        .with_node(node.id.clone()),
                    );
                }
                NodeConfig::Agent(def) if !self.agents.knows(&def.agent) => {
                    errors.push(
                        ValidationError::fatal(
                            ValidationCode::InvalidAgentId,
                            format!("agent `{}` is not known", def.agent),
                        )
                        .with_node(node.id.clone()),
                    );
                }
                _ => {}
            }
        }

        // Build the graph over unique nodes and valid edges.
        let mut graph: DiGraph<CompiledNode, EdgeData> = DiGraph::new();
        let mut node_indices: HashMap<NodeId, NodeIndex> = HashMap::new();
        for node in &unique {
            let idx = graph.add_node(self.compile_node(node));
            node_indices.insert(node.id.clone(), idx);
        }
        for edge in &valid_edges {
            if let (Some(&from), Some(&to)) =
                (node_indices.get(&edge.from), node_indices.get(&edge.to))
            {
                graph.add_edge(
                    from,
                    to,
                    EdgeData {
                        label: edge.label.clone(),
                    },
                );
            }
        }

        let entrypoints: Vec<NodeId> = unique
            .iter()
            .filter(|node| {
                node_indices
                    .get(&node.id)
                    .is_some_and(|&idx| {
                        graph
                            .neighbors_directed(idx, Direction::Incoming)
                            .next()
                            .is_none()
                    })
            })
            .map(|node| node.id.clone())
            .collect();
        let exits: Vec<NodeId> = unique
            .iter()
            .filter(|node| {
                node_indices
                    .get(&node.id)
                    .is_some_and(|&idx| {
                        graph
                            .neighbors_directed(idx, Direction::Outgoing)
                            .next()
                            .is_none()
                    })
            })
            .map(|node| node.id.clone())
            .collect();

        if entrypoints.is_empty() && !canvas.nodes.is_empty() {
            errors.push(ValidationError::fatal(
                ValidationCode::NoEntrypoint,
                "no node qualifies as an entrypoint; the graph has no valid starting point",
            ));
        }

        let order = if petgraph::algo::is_cyclic_directed(&graph) {
            errors.push(ValidationError::fatal(
                ValidationCode::CycleDetected,
                "the canvas contains a dependency cycle",
            ));
            Vec::new()
        } else {
            deterministic_topological_order(&graph, &unique, &node_indices)
        };

        // Orphans: neither reachable from an entrypoint nor reaching an
        // exit. A warning, not a rejection.
        let forward = reach(&graph, &node_indices, &entrypoints, Direction::Outgoing);
        let backward = reach(&graph, &node_indices, &exits, Direction::Incoming);
        for node in &unique {
            let Some(&idx) = node_indices.get(&node.id) else {
                continue;
            };
            if !forward.contains(&idx) && !backward.contains(&idx) {
                errors.push(
                    ValidationError::warning(
                        ValidationCode::OrphanedNode,
                        format!(
                            "node `{}` is neither reachable from an entrypoint nor reaches an exit",
                            node.id
                        ),
                    )
                    .with_node(node.id.clone()),
                );
            }
        }

        if errors.iter().any(ValidationError::is_fatal) {
            return Err(CompileRejection { errors });
        }

        tracing::debug!(
            target: TRACING_TARGET,
            node_count = graph.node_count(),
            edge_count = graph.edge_count(),
            entrypoints = entrypoints.len(),
            warnings = errors.len(),
            "Canvas compiled"
        );

        Ok(ExecutableGraph::new(
            graph,
            node_indices,
            order,
            entrypoints,
            exits,
            errors,
        ))
    }

    /// Selects the execution strategy for one node.
    fn compile_node(&self, node: &Node) -> CompiledNode {
        match &node.config {
            NodeConfig::Trigger(def) => CompiledNode::Trigger(TriggerExecutor::new(def.trigger)),
            NodeConfig::Tool(def) => CompiledNode::Tool(ToolExecutor::new(
                &def.tool,
                def.static_params.clone(),
                Arc::clone(&self.tools),
            )),
            NodeConfig::Agent(def) => CompiledNode::Agent(AgentExecutor::new(
                &def.agent,
                &def.message,
                Arc::clone(&self.agents),
            )),
            NodeConfig::Conditional(def) => {
                CompiledNode::Conditional(ConditionalExecutor::new(&def.expression))
            }
        }
    }
}

/// Kahn's algorithm with ties broken by authoring order, so replayed
/// executions visit identical graphs in identical order. petgraph's
/// toposort is not order-stable, which is why this runs by hand.
fn deterministic_topological_order(
    graph: &DiGraph<CompiledNode, EdgeData>,
    unique: &[&Node],
    node_indices: &HashMap<NodeId, NodeIndex>,
) -> Vec<NodeId> {
    let mut indegree: HashMap<NodeIndex, usize> = HashMap::new();
    for node in unique {
        if let Some(&idx) = node_indices.get(&node.id) {
            indegree.insert(
                idx,
                graph.neighbors_directed(idx, Direction::Incoming).count(),
            );
        }
    }

    // Heap keyed by authoring position; `unique` is in authoring order.
    let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (position, node) in unique.iter().enumerate() {
        if let Some(&idx) = node_indices.get(&node.id) {
            if indegree.get(&idx) == Some(&0) {
                ready.push(Reverse(position));
            }
        }
    }

    let mut order = Vec::with_capacity(unique.len());
    while let Some(Reverse(position)) = ready.pop() {
        let node = unique[position];
        order.push(node.id.clone());
        let Some(&idx) = node_indices.get(&node.id) else {
            continue;
        };
        let successors: Vec<NodeIndex> = graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        for succ in successors {
            if let Some(count) = indegree.get_mut(&succ) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    if let Some(succ_position) = unique
                        .iter()
                        .position(|n| node_indices.get(&n.id) == Some(&succ))
                    {
                        ready.push(Reverse(succ_position));
                    }
                }
            }
        }
    }
    order
}

/// Nodes reachable from `seeds` following `direction`, seeds included.
fn reach(
    graph: &DiGraph<CompiledNode, EdgeData>,
    node_indices: &HashMap<NodeId, NodeIndex>,
    seeds: &[NodeId],
    direction: Direction,
) -> HashSet<NodeIndex> {
    let mut seen: HashSet<NodeIndex> = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    for seed in seeds {
        if let Some(&idx) = node_indices.get(seed) {
            if seen.insert(idx) {
                queue.push_back(idx);
            }
        }
    }
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors_directed(current, direction) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use weft_core::TriggerKind;

    use super::*;
    use crate::definition::{AgentDef, ConditionalDef, ToolDef, TriggerDef};
    use crate::provider::{ScriptedAgentRunner, StaticToolRegistry};

    fn compiler() -> GraphCompiler {
        let tools = StaticToolRegistry::new()
            .register("http_get", |params: serde_json::Value| async move {
                Ok(params)
            })
            .register("notify", |_params| async { Ok(json!("sent")) });
        let agents = ScriptedAgentRunner::new().reply("writer", "ok");
        GraphCompiler::new(Arc::new(tools), Arc::new(agents))
    }

    fn chain_canvas() -> Canvas {
        let mut canvas = Canvas::new("chain");
        canvas
            .push_node(Node::new("start", TriggerDef::manual()))
            .push_node(Node::new("fetch", ToolDef::new("http_get")))
            .push_node(Node::new(
                "gate",
                ConditionalDef::new("${fetch.value} != null"),
            ))
            .push_edge(Edge::new("start", "fetch"))
            .push_edge(Edge::new("fetch", "gate"));
        canvas
    }

    #[test]
    fn test_well_formed_canvas_compiles() {
        let graph = compiler().compile(&chain_canvas()).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.entrypoints(), [NodeId::from("start")]);
        assert_eq!(graph.exits(), [NodeId::from("gate")]);
        assert_eq!(
            graph.topological_order(),
            [
                NodeId::from("start"),
                NodeId::from("fetch"),
                NodeId::from("gate")
            ]
        );
        assert!(graph.warnings().is_empty());
    }

    #[test]
    fn test_duplicate_node_id_rejects() {
        let mut canvas = chain_canvas();
        canvas.push_node(Node::new("fetch", ToolDef::new("notify")));
        let rejection = compiler().compile(&canvas).unwrap_err();
        assert!(rejection.has_code(ValidationCode::DuplicateNodeId));
    }

    #[test]
    fn test_all_defects_are_collected() {
        let mut canvas = chain_canvas();
        canvas
            .push_node(Node::new("bad_tool", ToolDef::new("missing_tool")))
            .push_node(Node::new("bad_agent", AgentDef::new("ghost", "hello")))
            .push_edge(Edge::new("gate", "nowhere"));
        let rejection = compiler().compile(&canvas).unwrap_err();

        assert!(rejection.has_code(ValidationCode::InvalidToolName));
        assert!(rejection.has_code(ValidationCode::InvalidAgentId));
        assert!(rejection.has_code(ValidationCode::InvalidEdgeTarget));
        assert!(rejection.fatal().count() >= 3);
    }

    #[test]
    fn test_empty_canvas_rejects() {
        let canvas = Canvas::new("empty");
        let rejection = compiler().compile(&canvas).unwrap_err();
        assert!(rejection.has_code(ValidationCode::EmptyCanvas));
    }

    #[test]
    fn test_cycle_rejects() {
        let mut canvas = Canvas::new("cyclic");
        canvas
            .push_node(Node::new("a", ToolDef::new("http_get")))
            .push_node(Node::new("b", ToolDef::new("http_get")))
            .push_edge(Edge::new("a", "b"))
            .push_edge(Edge::new("b", "a"));
        let rejection = compiler().compile(&canvas).unwrap_err();
        // A two-node loop also has no entrypoint; both findings surface.
        assert!(rejection.has_code(ValidationCode::CycleDetected));
        assert!(rejection.has_code(ValidationCode::NoEntrypoint));
    }

    #[test]
    fn test_orphan_warning_rides_along_with_fatal_findings() {
        // In an acyclic graph every node sits on some entrypoint-to-exit
        // path, so orphans only arise inside cyclic islands. The island
        // is rejected for its cycle, and the orphan findings come along
        // as warnings in the same report.
        let mut canvas = chain_canvas();
        canvas
            .push_node(Node::new("loop_a", ToolDef::new("notify")))
            .push_node(Node::new("loop_b", ToolDef::new("notify")));
        canvas
            .push_edge(Edge::new("loop_a", "loop_b"))
            .push_edge(Edge::new("loop_b", "loop_a"));

        let rejection = compiler().compile(&canvas).unwrap_err();
        assert!(rejection.has_code(ValidationCode::CycleDetected));
        assert!(rejection.has_code(ValidationCode::OrphanedNode));
        let orphan_warnings: Vec<_> = rejection
            .errors
            .iter()
            .filter(|e| e.code == ValidationCode::OrphanedNode)
            .collect();
        assert_eq!(orphan_warnings.len(), 2);
        assert!(orphan_warnings.iter().all(|e| !e.is_fatal()));
    }

    #[test]
    fn test_deterministic_order_breaks_ties_by_authoring_order() {
        let mut canvas = Canvas::new("diamond");
        canvas
            .push_node(Node::new("start", TriggerDef::new(TriggerKind::Manual)))
            .push_node(Node::new("right", ToolDef::new("notify")))
            .push_node(Node::new("left", ToolDef::new("http_get")))
            .push_node(Node::new("join", ToolDef::new("notify")))
            .push_edge(Edge::new("start", "right"))
            .push_edge(Edge::new("start", "left"))
            .push_edge(Edge::new("right", "join"))
            .push_edge(Edge::new("left", "join"));

        let graph = compiler().compile(&canvas).unwrap();
        // `right` is authored before `left`, so it is visited first.
        assert_eq!(
            graph.topological_order(),
            [
                NodeId::from("start"),
                NodeId::from("right"),
                NodeId::from("left"),
                NodeId::from("join")
            ]
        );

        // Recompiling yields the identical order.
        let again = compiler().compile(&canvas).unwrap();
        assert_eq!(graph.topological_order(), again.topological_order());
    }

    #[test]
    fn test_order_covers_every_node_exactly_once() {
        let graph = compiler().compile(&chain_canvas()).unwrap();
        let order = graph.topological_order();
        let distinct: std::collections::HashSet<_> = order.iter().collect();
        assert_eq!(order.len(), graph.node_count());
        assert_eq!(distinct.len(), order.len());
    }
}
