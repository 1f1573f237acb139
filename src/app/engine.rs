use crate::adapters::defs::json::JsonSymbolSource;
use crate::adapters::dot::exporter::render_dot;
use crate::adapters::fs::reader::JsonAstReader;
use crate::app::dto::*;
use crate::domain::ast::SourceTree;
use crate::domain::builder::TraceGraphBuilder;
use crate::domain::extractor::RelationExtractor;
use crate::domain::graph::TraceGraph;
use crate::domain::node::TraceNode;
use crate::domain::ports::{SourceParser, SymbolSource};
use crate::domain::query::TraceQuery;
use crate::domain::relation::{CallOrigin, Relation, RelationSet};
use crate::domain::search::{GraphWalk, RelationWalk, Trace, TraceStrategy};
use crate::domain::symbols::SymbolTable;
use anyhow::{Context as _, Result, bail};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::info;

/// Everything derived from one database plus one set of source trees.
/// Immutable once built; a reload builds a new one.
pub struct Analysis {
    pub symbols: SymbolTable,
    pub relations: RelationSet,
    pub graph: TraceGraph,
}

impl Analysis {
    pub fn build(symbols: SymbolTable, trees: &[SourceTree]) -> Result<Self> {
        let mut extractor = RelationExtractor::new(&symbols);
        for tree in trees {
            extractor
                .add_source(tree)
                .with_context(|| format!("Failed to extract relations from {}", tree.file))?;
        }
        let relations = extractor.finish();
        let graph = TraceGraphBuilder::new(&relations).build();

        info!(
            "Analysis ready: {} sources, {} relations, {} trace nodes, {} edges",
            trees.len(),
            relations.len(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self {
            symbols,
            relations,
            graph,
        })
    }

    /// Load the database and every source through the given ports, then build.
    pub fn load(
        symbol_source: &dyn SymbolSource,
        parser: &dyn SourceParser,
        source_paths: &[PathBuf],
    ) -> Result<Self> {
        let symbols = symbol_source.load()?;
        let trees = source_paths
            .iter()
            .map(|path| parser.parse(path))
            .collect::<Result<Vec<_>>>()?;
        Self::build(symbols, &trees)
    }

    pub fn trace(&self, query: &TraceQuery, strategy: TraceStrategy) -> Result<BTreeSet<Trace>> {
        let resolved = query.resolve(&self.symbols)?;
        Ok(match strategy {
            TraceStrategy::Direct => RelationWalk::new(&self.relations).run(&resolved),
            TraceStrategy::Graph => GraphWalk::new(&self.graph).run(&resolved),
        })
    }

    pub fn trace_step(&self, node: &TraceNode) -> TraceStep {
        match node {
            TraceNode::Toplevel => TraceStep {
                kind: StepKind::Toplevel,
                name: "toplevel".to_string(),
                file: None,
                line: None,
                invoked_with: None,
            },
            TraceNode::MethodBody { method, invocation } => {
                let site = self
                    .symbols
                    .method(*method)
                    .and_then(|def| def.location.as_ref());
                TraceStep {
                    kind: StepKind::Method,
                    name: self.symbols.qualified_name(*method),
                    file: site.map(|s| s.file.clone()),
                    line: site.map(|s| s.line),
                    invoked_with: invocation.as_ref().map(|block| block.location().to_string()),
                }
            }
            TraceNode::Block { site } => TraceStep {
                kind: StepKind::Block,
                name: "block".to_string(),
                file: Some(site.location().file.to_string()),
                line: Some(site.location().span.start_line),
                invoked_with: None,
            },
        }
    }

    fn origin_label(&self, origin: &CallOrigin) -> String {
        match origin {
            CallOrigin::Toplevel => "toplevel".to_string(),
            CallOrigin::Method(method) => self.symbols.qualified_name(*method),
            CallOrigin::Block(site) => site.to_string(),
        }
    }

    pub fn relation_view(&self, relation: &Relation) -> RelationView {
        let (block, pass_through_block) = match relation {
            Relation::BlockCall { block, .. } => (Some(block.to_string()), None),
            Relation::PassCall {
                pass_through_block, ..
            } => (None, Some(*pass_through_block)),
            _ => (None, None),
        };
        RelationView {
            kind: relation.kind_name().to_string(),
            origin: self.origin_label(relation.origin()),
            callee: relation.callee().map(|m| self.symbols.qualified_name(m)),
            location: relation.location().to_string(),
            block,
            pass_through_block,
        }
    }
}

#[derive(Clone)]
pub struct AnalysisEngine {
    inner: Arc<RwLock<EngineData>>,
}

struct EngineData {
    database_path: PathBuf,
    source_paths: Vec<PathBuf>,
    source_count: usize,
    analysis: Arc<Analysis>,
}

impl AnalysisEngine {
    /// Construct an engine from an already-built analysis.
    ///
    /// Used for testing or when trees come from an in-process parser. `reload`
    /// re-reads `database_path` but has no source files to re-read.
    pub fn from_prebuilt(database_path: PathBuf, source_count: usize, analysis: Analysis) -> Self {
        Self {
            inner: Arc::new(RwLock::new(EngineData {
                database_path,
                source_paths: Vec::new(),
                source_count,
                analysis: Arc::new(analysis),
            })),
        }
    }

    /// Load a JSON symbol database and JSON source trees from disk.
    pub fn load(database_path: &Path, source_paths: &[PathBuf]) -> Result<Self> {
        let analysis = Analysis::load(
            &JsonSymbolSource::new(database_path),
            &JsonAstReader::new(),
            source_paths,
        )?;
        Ok(Self {
            inner: Arc::new(RwLock::new(EngineData {
                database_path: database_path.to_path_buf(),
                source_paths: source_paths.to_vec(),
                source_count: source_paths.len(),
                analysis: Arc::new(analysis),
            })),
        })
    }

    fn data(&self) -> RwLockReadGuard<'_, EngineData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current analysis; stays valid across reloads.
    pub fn analysis(&self) -> Arc<Analysis> {
        self.data().analysis.clone()
    }

    /// Rebuild from the same files. The previous analysis stays in place if
    /// anything fails.
    pub fn reload(&self) -> Result<HealthResponse> {
        let (database_path, source_paths) = {
            let data = self.data();
            if data.source_paths.is_empty() && data.source_count > 0 {
                bail!(
                    "analysis of {} source files was built in memory; there are no paths to reload it from",
                    data.source_count
                );
            }
            (data.database_path.clone(), data.source_paths.clone())
        };
        let analysis = Analysis::load(
            &JsonSymbolSource::new(&database_path),
            &JsonAstReader::new(),
            &source_paths,
        )?;

        {
            let mut data = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            data.analysis = Arc::new(analysis);
            data.source_count = source_paths.len();
        }
        Ok(self.health())
    }

    pub fn health(&self) -> HealthResponse {
        let data = self.data();
        HealthResponse {
            database_path: data.database_path.to_string_lossy().to_string(),
            source_count: data.source_count,
            relation_count: data.analysis.relations.len(),
            node_count: data.analysis.graph.node_count(),
            edge_count: data.analysis.graph.edge_count(),
        }
    }

    pub fn trace(&self, req: TraceRequest) -> Result<TraceResponse> {
        let analysis = self.analysis();
        let query = TraceQuery::parse(&req.components)?;
        let traces = analysis.trace(&query, req.strategy.into())?;

        let traces: Vec<Vec<TraceStep>> = traces
            .iter()
            .map(|trace| trace.iter().map(|node| analysis.trace_step(node)).collect())
            .collect();
        Ok(TraceResponse {
            components: req.components,
            strategy: req.strategy,
            trace_count: traces.len(),
            traces,
        })
    }

    pub fn graph_summary(&self) -> GraphSummary {
        let analysis = self.analysis();
        let graph = &analysis.graph;
        let method_node_count = graph
            .nodes()
            .filter(|node| matches!(node, TraceNode::MethodBody { .. }))
            .count();
        let block_node_count = graph
            .nodes()
            .filter(|node| matches!(node, TraceNode::Block { .. }))
            .count();

        GraphSummary {
            relation_count: analysis.relations.len(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            method_node_count,
            block_node_count,
            component_count: graph.reachability().component_count(),
        }
    }

    pub fn relations(&self) -> Vec<RelationView> {
        let analysis = self.analysis();
        analysis
            .relations
            .iter()
            .map(|relation| analysis.relation_view(relation))
            .collect()
    }

    pub fn dot(&self) -> Result<String> {
        let analysis = self.analysis();
        render_dot(&analysis.graph, &analysis.symbols)
    }
}
