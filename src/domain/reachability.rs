use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashSet;

/// Per-node transitive reachability, computed once over the strongly connected
/// components of a finished graph.
///
/// Every node of a component shares the component's reachable set, which always
/// contains the node itself.
#[derive(Debug, Clone, Default)]
pub struct ReachabilityIndex {
    /// node index -> component id
    component_of: Vec<usize>,
    /// component id -> nodes reachable from any member
    reachable: Vec<HashSet<NodeIndex>>,
}

impl ReachabilityIndex {
    pub fn build<N, E>(graph: &DiGraph<N, E>) -> Self {
        // tarjan_scc yields components in reverse topological order, so every
        // successor component is complete before its predecessors are visited.
        let components = tarjan_scc(graph);
        let mut component_of = vec![0; graph.node_count()];
        for (id, members) in components.iter().enumerate() {
            for member in members {
                component_of[member.index()] = id;
            }
        }

        let mut reachable: Vec<HashSet<NodeIndex>> = Vec::with_capacity(components.len());
        for (id, members) in components.iter().enumerate() {
            let mut set: HashSet<NodeIndex> = members.iter().copied().collect();
            for member in members {
                for next in graph.neighbors(*member) {
                    let next_component = component_of[next.index()];
                    if next_component != id {
                        set.extend(reachable[next_component].iter().copied());
                    }
                }
            }
            reachable.push(set);
        }

        Self {
            component_of,
            reachable,
        }
    }

    /// Nodes reachable from `node`, itself included. Empty for unknown indices.
    pub fn reachable_from(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.component_of
            .get(node.index())
            .map(|component| &self.reachable[*component])
            .into_iter()
            .flatten()
            .copied()
    }

    pub fn reaches(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.component_of
            .get(from.index())
            .is_some_and(|component| self.reachable[*component].contains(&to))
    }

    pub fn component_count(&self) -> usize {
        self.reachable.len()
    }
}
