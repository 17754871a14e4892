//! Model listing endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Build the models router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(models))
}

/// GET /node/v1/models - list models the runtime has available.
async fn models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let data: Vec<_> = state
        .runtime
        .list_models()
        .await
        .into_iter()
        .map(|id| json!({"id": id, "object": "model"}))
        .collect();

    Json(json!({"object": "list", "data": data}))
}
