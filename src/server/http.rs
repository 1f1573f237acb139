use crate::app::dto::*;
use crate::app::engine::AnalysisEngine;
use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct HttpState {
    pub engine: AnalysisEngine,
}

#[derive(Debug, Clone, serde::Serialize)]
struct ApiErrorBody {
    error: String,
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> impl IntoResponse {
    (status, Json(ApiErrorBody { error: msg.into() }))
}

pub fn build_router(engine: AnalysisEngine) -> Router {
    let state = Arc::new(HttpState { engine });

    Router::new()
        .route("/health", get(health))
        .route("/trace", post(trace))
        .route("/graph", get(graph))
        .route("/graph.dot", get(graph_dot))
        .route("/relations", get(relations))
        .route("/reload", post(reload))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(engine: AnalysisEngine, addr: SocketAddr) -> Result<()> {
    let app = build_router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(state.engine.health())
}

async fn reload(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let engine = state.engine.clone();
    match spawn_blocking(move || engine.reload()).await {
        Ok(Ok(res)) => Json(res).into_response(),
        Ok(Err(e)) => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")).into_response()
        }
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
        .into_response(),
    }
}

async fn trace(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<TraceRequest>,
) -> impl IntoResponse {
    let engine = state.engine.clone();
    match spawn_blocking(move || engine.trace(req)).await {
        Ok(Ok(res)) => Json(res).into_response(),
        Ok(Err(e)) => api_error(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
        .into_response(),
    }
}

async fn graph(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let engine = state.engine.clone();
    match spawn_blocking(move || engine.graph_summary()).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
        .into_response(),
    }
}

async fn graph_dot(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let engine = state.engine.clone();
    match spawn_blocking(move || engine.dot()).await {
        Ok(Ok(dot)) => ([(header::CONTENT_TYPE, "text/vnd.graphviz")], dot).into_response(),
        Ok(Err(e)) => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
        .into_response(),
    }
}

async fn relations(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let engine = state.engine.clone();
    match spawn_blocking(move || engine.relations()).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::engine::Analysis;
    use crate::domain::ast::{Child, Node, NodeKind, SourceSpan, SourceTree};
    use crate::domain::symbols::{DefinitionSite, ParamKind, Parameter, SymbolTable};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// def fact(n); fact(n); end; fact(1)
    fn make_engine() -> AnalysisEngine {
        let mut symbols = SymbolTable::new();
        let root = symbols.root();
        symbols.add_method(
            root,
            "fact",
            false,
            vec![Parameter::new(ParamKind::Req, "n")],
            Some(DefinitionSite::new("test1.rb", 1)),
        );
        let n = |kind: &str, line: u32, children: Vec<Child>| {
            Node::new(NodeKind::from(kind), children, SourceSpan::line(line))
        };
        let call = |line: u32| {
            n(
                "send",
                line,
                vec![Child::Nil, "fact".into(), n("int", line, vec![Child::Int(1)]).into()],
            )
        };
        let tree = n(
            "begin",
            1,
            vec![
                n(
                    "def",
                    1,
                    vec![
                        "fact".into(),
                        n("args", 1, vec![n("arg", 1, vec!["n".into()]).into()]).into(),
                        call(2).into(),
                    ],
                )
                .into(),
                call(5).into(),
            ],
        );
        let analysis = Analysis::build(symbols, &[SourceTree::new("test1.rb", tree)]).unwrap();
        AnalysisEngine::from_prebuilt("defs.json".into(), 1, analysis)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_http_health_and_trace() {
        let app = build_router(make_engine());

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["relation_count"], 2);

        let body = serde_json::json!({
          "components": ["toplevel", "Object#fact", "Object#fact"],
          "strategy": "direct"
        });
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trace")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["trace_count"], 1);
        assert_eq!(json["traces"][0][1]["name"], "Object#fact");

        let bad = serde_json::json!({ "components": ["toplevel", "fact"] });
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trace")
                    .header("content-type", "application/json")
                    .body(Body::from(bad.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(
            body_json(res).await["error"]
                .as_str()
                .unwrap()
                .contains("invalid query component")
        );
    }

    #[tokio::test]
    async fn test_http_graph_endpoints() {
        let app = build_router(make_engine());

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/graph").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["node_count"], 2);
        assert_eq!(json["edge_count"], 2);

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/graph.dot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).starts_with("digraph trace {"));

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
