//! OpenAI-compatible /v1/models endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::auth;
use crate::AppState;

/// GET /v1/models - Best-effort model listing from one healthy node.
async fn list_models(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    auth::require_api_key(&headers, &state.config.api_key_list())
        .map_err(|e| e.into_response())?;

    Ok(Json(state.dispatcher.models().await))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/models", get(list_models))
        .with_state(state)
}
