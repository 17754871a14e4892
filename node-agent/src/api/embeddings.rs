//! Embeddings endpoint backed by the local runtime.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::Result;
use crate::ops::EmbeddingsPayload;
use crate::state::AppState;

/// Build the embeddings router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/embeddings", post(embeddings))
}

/// POST /node/v1/embeddings - embed one input string.
async fn embeddings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmbeddingsPayload>,
) -> Result<Json<Value>> {
    let vector = state
        .runtime
        .embeddings(&request.model, &request.input)
        .await?;
    Ok(Json(json!({"embedding": vector})))
}
