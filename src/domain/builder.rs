use crate::domain::flow::successors;
use crate::domain::graph::TraceGraph;
use crate::domain::node::{BlockContext, TraceNode};
use crate::domain::relation::{BlockSite, CallOrigin, Relation, RelationSet};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A node together with the innermost block pending while it runs.
///
/// For method bodies that is the node's own invocation site. A block node can
/// run under several: whatever was pending where its literal was handed over.
type State = (TraceNode, Option<BlockSite>);

/// Graph builder - Domain Service for constructing TraceGraph
pub struct TraceGraphBuilder<'a> {
    relations: &'a RelationSet,
}

#[derive(Default)]
struct Expansion {
    visited: HashSet<State>,
    worklist: Vec<State>,
    /// block site -> innermost blocks pending at the calls that hand it over
    outer: HashMap<BlockSite, BTreeSet<Option<BlockSite>>>,
    /// block sites that already have a node
    entered: HashSet<BlockSite>,
}

impl Expansion {
    fn schedule(&mut self, state: State) {
        if self.visited.insert(state.clone()) {
            self.worklist.push(state);
        }
    }
}

impl<'a> TraceGraphBuilder<'a> {
    pub fn new(relations: &'a RelationSet) -> Self {
        Self { relations }
    }

    /// Expand every toplevel and method origin, each entered without a pending
    /// block, and everything transitively reachable from it.
    ///
    /// States are keyed on the node plus its innermost pending block, so the
    /// graph has at most one body per method and block site, one node per
    /// block, and the toplevel.
    pub fn build(&self) -> TraceGraph {
        let mut graph: DiGraph<TraceNode, ()> = DiGraph::new();
        let mut node_to_index: HashMap<TraceNode, NodeIndex> = HashMap::new();
        let mut expansion = Expansion::default();

        let mut intern = |graph: &mut DiGraph<TraceNode, ()>, node: &TraceNode| -> NodeIndex {
            *node_to_index
                .entry(node.clone())
                .or_insert_with(|| graph.add_node(node.clone()))
        };

        for origin in self.relations.origins() {
            let root = match origin {
                CallOrigin::Toplevel => TraceNode::Toplevel,
                CallOrigin::Method(method) => TraceNode::entry(*method),
                // blocks are only entered through a call that hands them over
                CallOrigin::Block(_) => continue,
            };
            intern(&mut graph, &root);
            expansion.schedule((root, None));

            while let Some((node, innermost)) = expansion.worklist.pop() {
                let source = intern(&mut graph, &node);

                // a literal handed over here runs with `innermost` below it
                for relation in self.relations.from_origin(&node.origin()) {
                    if let Relation::BlockCall { block, .. } = relation {
                        let added = expansion
                            .outer
                            .entry(block.clone())
                            .or_default()
                            .insert(innermost.clone());
                        if added && expansion.entered.contains(block) {
                            expansion.schedule((TraceNode::block(block.clone()), innermost.clone()));
                        }
                    }
                }

                let pending = BlockContext::from(innermost);
                for (next, next_pending) in successors(self.relations, &node, &pending) {
                    let destination = intern(&mut graph, &next);
                    graph.update_edge(source, destination, ());
                    let entered = match &next {
                        TraceNode::Block { site } => Some(site.clone()),
                        _ => None,
                    };
                    match entered {
                        Some(site) => {
                            let outers: Vec<Option<BlockSite>> = expansion
                                .outer
                                .get(&site)
                                .into_iter()
                                .flatten()
                                .cloned()
                                .collect();
                            expansion.entered.insert(site);
                            for outer in outers {
                                expansion.schedule((next.clone(), outer));
                            }
                        }
                        None => {
                            let innermost = next_pending.innermost().cloned();
                            expansion.schedule((next, innermost));
                        }
                    }
                }
            }
        }

        debug!(
            "Trace graph expanded: {} nodes, {} edges from {} states",
            graph.node_count(),
            graph.edge_count(),
            expansion.visited.len()
        );
        TraceGraph::new(graph, node_to_index)
    }
}
