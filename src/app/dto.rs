use crate::domain::search::TraceStrategy;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum StrategyKind {
    /// Walk the materialized trace graph, pruned by reachability.
    #[default]
    Graph,
    /// Walk the extracted relations directly.
    Direct,
}

impl From<StrategyKind> for TraceStrategy {
    fn from(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Graph => TraceStrategy::Graph,
            StrategyKind::Direct => TraceStrategy::Direct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub database_path: String,
    pub source_count: usize,
    pub relation_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TraceRequest {
    /// Query components: `toplevel`, `Class#instance_method` or `Class.singleton_method`.
    /// The first one is the start; at least two are required.
    pub components: Vec<String>,
    #[serde(default)]
    pub strategy: StrategyKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TraceResponse {
    pub components: Vec<String>,
    pub strategy: StrategyKind,
    pub trace_count: usize,
    pub traces: Vec<Vec<TraceStep>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Toplevel,
    Method,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TraceStep {
    pub kind: StepKind,
    /// `toplevel`, `Owner#name` / `Owner.name`, or `block`.
    pub name: String,
    /// Definition file of the method, or the file of the block literal.
    pub file: Option<String>,
    /// 1-based line of the method definition or block literal.
    pub line: Option<u32>,
    /// Block literal a method body was invoked with, as `file:line:column`.
    pub invoked_with: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GraphSummary {
    pub relation_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub method_node_count: usize,
    pub block_node_count: usize,
    /// Strongly connected components of the trace graph.
    pub component_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationView {
    /// `call`, `block_call`, `pass_call` or `yield`.
    pub kind: String,
    pub origin: String,
    pub callee: Option<String>,
    pub location: String,
    pub block: Option<String>,
    pub pass_through_block: Option<bool>,
}
