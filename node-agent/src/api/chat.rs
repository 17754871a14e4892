//! Chat endpoint backed by the local runtime.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::Result;
use crate::ops::ChatPayload;
use crate::state::AppState;

/// Build the chat router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /node/v1/chat - run a chat turn against the local runtime.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatPayload>,
) -> Result<Json<Value>> {
    tracing::debug!("Chat request for model: {}", request.model);

    let content = state.runtime.chat(&request.model, &request.messages).await?;
    Ok(Json(json!({"content": content})))
}
