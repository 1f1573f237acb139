use crate::domain::node::TraceNode;
use crate::domain::reachability::ReachabilityIndex;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Trace Graph - materialized control flow between trace nodes.
///
/// Built once by `TraceGraphBuilder` and never modified afterwards, so the
/// reachability index computed at construction stays valid for its lifetime.
#[derive(Debug, Clone)]
pub struct TraceGraph {
    graph: DiGraph<TraceNode, ()>,
    node_to_index: HashMap<TraceNode, NodeIndex>,
    reachability: ReachabilityIndex,
}

impl TraceGraph {
    pub(crate) fn new(graph: DiGraph<TraceNode, ()>, node_to_index: HashMap<TraceNode, NodeIndex>) -> Self {
        let reachability = ReachabilityIndex::build(&graph);
        Self {
            graph,
            node_to_index,
            reachability,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, node: &TraceNode) -> Option<NodeIndex> {
        self.node_to_index.get(node).copied()
    }

    pub fn contains(&self, node: &TraceNode) -> bool {
        self.node_to_index.contains_key(node)
    }

    pub fn node(&self, idx: NodeIndex) -> &TraceNode {
        &self.graph[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TraceNode> {
        self.graph.node_weights()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&TraceNode, &TraceNode)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()]))
    }

    /// Whether any edge satisfies `pred(source, destination)`.
    pub fn has_edge(&self, mut pred: impl FnMut(&TraceNode, &TraceNode) -> bool) -> bool {
        self.edges().any(|(source, destination)| pred(source, destination))
    }

    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    pub fn reachability(&self) -> &ReachabilityIndex {
        &self.reachability
    }

    pub fn node_set(&self) -> HashSet<TraceNode> {
        self.nodes().cloned().collect()
    }

    pub fn edge_set(&self) -> HashSet<(TraceNode, TraceNode)> {
        self.edges()
            .map(|(source, destination)| (source.clone(), destination.clone()))
            .collect()
    }
}
