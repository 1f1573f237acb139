//! Trace search: enumerate execution paths that visit the query targets in order.
//!
//! A trace starts at the query's start node. Each segment of the search walks
//! forward until it steps onto a node matching the current target; that node then
//! starts the next segment from scratch. Within a segment a node already on the
//! segment's path is not entered again, which bounds the search on cyclic graphs.
//!
//! `RelationWalk` derives successors from the relations on the fly and carries
//! the full stack of pending blocks along each path, so a yield inside a block
//! only reaches the block that is actually pending there.
//! `GraphWalk` follows materialized edges and skips any edge from which the
//! reachability index says no target node can be reached. A block node's edges
//! cover every context it can run in, so graph traces are a superset of the
//! direct walk's traces.

use crate::domain::flow::successors;
use crate::domain::graph::TraceGraph;
use crate::domain::node::{BlockContext, TraceNode};
use crate::domain::query::{QueryTarget, ResolvedQuery};
use crate::domain::relation::RelationSet;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeSet, HashMap, HashSet};

pub type Trace = Vec<TraceNode>;

/// Which search strategy answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceStrategy {
    /// Materialized graph plus reachability pruning.
    #[default]
    Graph,
    /// Walk over the relations without building the graph.
    Direct,
}

/// Direct relation walk.
pub struct RelationWalk<'a> {
    relations: &'a RelationSet,
}

impl<'a> RelationWalk<'a> {
    pub fn new(relations: &'a RelationSet) -> Self {
        Self { relations }
    }

    pub fn run(&self, query: &ResolvedQuery) -> BTreeSet<Trace> {
        if query.targets.is_empty() {
            return BTreeSet::new();
        }
        self.from_segment_start(&query.start, BlockContext::empty(), 0, &query.targets)
    }

    /// Traces beginning at `start` that satisfy `targets[stage..]`.
    fn from_segment_start(
        &self,
        start: &TraceNode,
        pending: BlockContext,
        stage: usize,
        targets: &[QueryTarget],
    ) -> BTreeSet<Trace> {
        let mut results = BTreeSet::new();
        let mut path = vec![(start.clone(), pending)];
        let mut on_path = HashSet::from([start.clone()]);
        self.walk(stage, targets, &mut path, &mut on_path, &mut results);
        results
    }

    fn walk(
        &self,
        stage: usize,
        targets: &[QueryTarget],
        path: &mut Vec<(TraceNode, BlockContext)>,
        on_path: &mut HashSet<TraceNode>,
        results: &mut BTreeSet<Trace>,
    ) {
        let Some((current, pending)) = path.last().cloned() else {
            return;
        };
        for (next, next_pending) in successors(self.relations, &current, &pending) {
            if targets[stage].matches(&next) {
                if stage + 1 == targets.len() {
                    let mut trace = nodes_of(path);
                    trace.push(next);
                    results.insert(trace);
                } else {
                    for tail in self.from_segment_start(&next, next_pending, stage + 1, targets) {
                        let mut trace = nodes_of(path);
                        trace.extend(tail);
                        results.insert(trace);
                    }
                }
            } else if !on_path.contains(&next) {
                on_path.insert(next.clone());
                path.push((next, next_pending));
                self.walk(stage, targets, path, on_path, results);
                if let Some((done, _)) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
}

fn nodes_of(path: &[(TraceNode, BlockContext)]) -> Trace {
    path.iter().map(|(node, _)| node.clone()).collect()
}

/// Graph + reachability walk.
pub struct GraphWalk<'a> {
    graph: &'a TraceGraph,
}

struct GraphSearch<'q> {
    targets: &'q [QueryTarget],
    /// per stage: nodes from which some node matching that stage's target is reachable
    viable: Vec<HashSet<NodeIndex>>,
    /// suffix traces per (segment start, stage)
    memo: HashMap<(NodeIndex, usize), BTreeSet<Vec<NodeIndex>>>,
}

impl<'a> GraphWalk<'a> {
    pub fn new(graph: &'a TraceGraph) -> Self {
        Self { graph }
    }

    pub fn run(&self, query: &ResolvedQuery) -> BTreeSet<Trace> {
        let Some(start) = self.graph.index_of(&query.start) else {
            return BTreeSet::new();
        };
        if query.targets.is_empty() {
            return BTreeSet::new();
        }

        let reachability = self.graph.reachability();
        let viable = query
            .targets
            .iter()
            .map(|target| {
                let hits: Vec<NodeIndex> = self
                    .graph
                    .node_indices()
                    .filter(|idx| target.matches(self.graph.node(*idx)))
                    .collect();
                self.graph
                    .node_indices()
                    .filter(|idx| hits.iter().any(|hit| reachability.reaches(*idx, *hit)))
                    .collect()
            })
            .collect();

        let mut search = GraphSearch {
            targets: &query.targets,
            viable,
            memo: HashMap::new(),
        };
        self.from_segment_start(&mut search, start, 0)
            .into_iter()
            .map(|trace| trace.into_iter().map(|idx| self.graph.node(idx).clone()).collect())
            .collect()
    }

    fn from_segment_start(
        &self,
        search: &mut GraphSearch<'_>,
        start: NodeIndex,
        stage: usize,
    ) -> BTreeSet<Vec<NodeIndex>> {
        if let Some(known) = search.memo.get(&(start, stage)) {
            return known.clone();
        }
        let mut results = BTreeSet::new();
        let mut path = vec![start];
        let mut on_path = HashSet::from([start]);
        self.walk(search, stage, &mut path, &mut on_path, &mut results);
        search.memo.insert((start, stage), results.clone());
        results
    }

    fn walk(
        &self,
        search: &mut GraphSearch<'_>,
        stage: usize,
        path: &mut Vec<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
        results: &mut BTreeSet<Vec<NodeIndex>>,
    ) {
        let Some(current) = path.last().copied() else {
            return;
        };
        let target = search.targets[stage];
        let last_stage = stage + 1 == search.targets.len();

        let next_nodes: Vec<NodeIndex> = self.graph.successors(current).collect();
        for next in next_nodes {
            if target.matches(self.graph.node(next)) {
                if last_stage {
                    let mut trace = path.clone();
                    trace.push(next);
                    results.insert(trace);
                } else {
                    for tail in self.from_segment_start(search, next, stage + 1) {
                        let mut trace = path.clone();
                        trace.extend(tail);
                        results.insert(trace);
                    }
                }
            } else if !on_path.contains(&next) && search.viable[stage].contains(&next) {
                on_path.insert(next);
                path.push(next);
                self.walk(search, stage, path, on_path, results);
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
}
