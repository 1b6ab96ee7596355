//! HTTP API for the routewatch node
//!
//! Every handler only reads state committed by the collection loop; no
//! request triggers a fetch.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use routewatch_core::{CycleReport, RoutewatchError, RoutewatchResult, Timestamp};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::runtime::NodeRuntime;
use crate::scheduler::SchedulerState;

/// API state containing node runtime
pub type ApiState = Arc<NodeRuntime>;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Node status response
#[derive(Serialize)]
pub struct NodeStatusResponse {
    pub name: String,
    pub source: String,
    pub schedule: String,
    pub interval_secs: u64,
    pub scheduler: SchedulerState,
    pub generation: u64,
    pub committed_at: Option<Timestamp>,
    pub route_count: usize,
    pub last_cycle: Option<CycleReport>,
    pub last_error: Option<String>,
}

/// Retained routes response
#[derive(Serialize)]
pub struct RoutesResponse {
    pub generation: u64,
    pub committed_at: Option<Timestamp>,
    pub routes: Vec<String>,
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Scrape endpoint
        .route("/metrics", get(metrics))
        // Diagnostics
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/routes", get(routes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Prometheus text exposition
async fn metrics(State(runtime): State<ApiState>) -> Response {
    let sink = runtime.sink();
    match sink.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, sink.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Node status
async fn status(State(runtime): State<ApiState>) -> impl IntoResponse {
    let store = runtime.store().status();
    let collector = runtime.collector();
    let config = &runtime.config().collector;

    let status = NodeStatusResponse {
        name: runtime.config().name.clone(),
        source: collector.source_name().to_string(),
        schedule: config.schedule.to_string(),
        interval_secs: config.interval_secs,
        scheduler: runtime.scheduler_state(),
        generation: store.generation,
        committed_at: store.committed_at,
        route_count: store.route_count,
        last_cycle: collector.last_report(),
        last_error: collector.last_error(),
    };

    Json(ApiResponse::ok(status))
}

/// Retained snapshot
async fn routes(State(runtime): State<ApiState>) -> impl IntoResponse {
    let (snapshot, status) = runtime.store().view();
    let response = RoutesResponse {
        generation: status.generation,
        committed_at: status.committed_at,
        routes: snapshot.iter().map(|route| route.to_string()).collect(),
    };

    Json(ApiResponse::ok(response))
}

/// Bind the API listener
pub async fn bind_api(addr: SocketAddr) -> RoutewatchResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| RoutewatchError::Io(format!("cannot bind {}: {}", addr, e)))
}

/// Serve the API until `shutdown` fires
pub async fn start_api_server(
    runtime: Arc<NodeRuntime>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = create_router(runtime);

    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
