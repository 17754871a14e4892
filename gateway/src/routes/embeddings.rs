//! OpenAI-compatible embeddings endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EmbeddingsRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub input: String,
}

/// POST /v1/embeddings - OpenAI-compatible embeddings endpoint.
async fn embeddings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<EmbeddingsRequest>,
) -> Result<Json<Value>, Response> {
    auth::require_api_key(&headers, &state.config.api_key_list())
        .map_err(|e| e.into_response())?;

    let model = request
        .model
        .unwrap_or_else(|| state.config.default_embed_model.clone());

    let data = state
        .dispatcher
        .embeddings(&model, &request.input)
        .await
        .map_err(|e| e.into_response())?;

    let vector = data.get("embedding").cloned().unwrap_or_else(|| json!([]));

    Ok(Json(json!({
        "object": "list",
        "model": model,
        "data": [{
            "object": "embedding",
            "index": 0,
            "embedding": vector
        }]
    })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/embeddings", post(embeddings))
        .with_state(state)
}
