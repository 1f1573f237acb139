use crate::app::dto::*;
use crate::app::engine::AnalysisEngine;
use rmcp::{
    Json, ServerHandler, ServiceExt, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, tool, tool_handler, tool_router,
    transport::stdio,
};
use tokio::task::spawn_blocking;

#[derive(Clone)]
pub struct TraceMcpServer {
    engine: AnalysisEngine,
    tool_router: ToolRouter<Self>,
}

impl TraceMcpServer {
    pub fn new(engine: AnalysisEngine) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        let service = self.serve(stdio()).await?;
        service.waiting().await?;
        Ok(())
    }
}

#[tool_router]
impl TraceMcpServer {
    #[tool(
        description = "Find possible execution traces visiting the given methods in order. Components: `toplevel`, `Class#instance_method`, `Class.singleton_method`; the first is the start."
    )]
    async fn trace(&self, params: Parameters<TraceRequest>) -> Result<Json<TraceResponse>, String> {
        let engine = self.engine.clone();
        let req = params.0;
        spawn_blocking(move || engine.trace(req))
            .await
            .map_err(|e| format!("task join error: {e}"))?
            .map(Json)
            .map_err(|e| e.to_string())
    }

    #[tool(description = "Summarize the trace graph: relation, node, edge and component counts.")]
    async fn graph_summary(&self) -> Result<Json<GraphSummary>, String> {
        let engine = self.engine.clone();
        spawn_blocking(move || engine.graph_summary())
            .await
            .map(Json)
            .map_err(|e| format!("task join error: {e}"))
    }

    #[tool(description = "Re-read the symbol database and source trees, then rebuild the trace graph.")]
    async fn reload(&self) -> Result<Json<HealthResponse>, String> {
        let engine = self.engine.clone();
        spawn_blocking(move || engine.reload())
            .await
            .map_err(|e| format!("task join error: {e}"))?
            .map(Json)
            .map_err(|e| e.to_string())
    }
}

#[tool_handler]
impl ServerHandler for TraceMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Query statically reconstructed call traces of a Ruby program (call graph built from a symbol database and parsed sources)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
