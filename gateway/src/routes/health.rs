use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    detail: String,
}

/// Healthy when at least one runtime is registered.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let nodes = state.registry.count().await;
    Json(HealthResponse {
        status: if nodes > 0 { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        detail: format!("runtimes={}", nodes),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let version = env!("CARGO_PKG_VERSION");
    let nodes = state.registry.count().await;
    let body = format!(
        "# HELP infergrid_up Whether the service is up\n\
         # TYPE infergrid_up gauge\n\
         infergrid_up 1\n\
         # HELP infergrid_info Service information\n\
         # TYPE infergrid_info gauge\n\
         infergrid_info{{version=\"{}\"}} 1\n\
         # HELP infergrid_nodes Currently registered nodes\n\
         # TYPE infergrid_nodes gauge\n\
         infergrid_nodes {}\n",
        version, nodes
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}
