//! Admin surface: live node inventory and enrollment.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::AppState;

/// GET /admin/nodes - snapshot of currently known nodes.
async fn list_nodes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    auth::require_api_key(&headers, &state.config.api_key_list())
        .map_err(|e| e.into_response())?;

    let nodes = state.registry.list().await;
    Ok(Json(json!({ "nodes": nodes })))
}

#[derive(Debug, Deserialize)]
struct EnrollRequest {
    /// Optional override of the configured token TTL.
    #[serde(default)]
    ttl_seconds: Option<u64>,
}

/// POST /admin/enroll - mint a join token for a new node.
async fn enroll(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<EnrollRequest>>,
) -> Result<Json<Value>, Response> {
    auth::require_api_key(&headers, &state.config.api_key_list())
        .map_err(|e| e.into_response())?;

    let ttl = body
        .and_then(|Json(body)| body.ttl_seconds)
        .map(Duration::from_secs);
    let token = state.enrollment.create_join_token(ttl);

    Ok(Json(json!({
        "token": token.token,
        "expires_at": token.expires_at.to_rfc3339(),
    })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/nodes", get(list_nodes))
        .route("/enroll", post(enroll))
        .with_state(state)
}
