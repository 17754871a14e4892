//! OpenAI-compatible chat completions endpoint.

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

use infergrid_common::ChatMessage;

use crate::auth;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Accepted for API-shape compatibility; sampling is the node's concern.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// POST /v1/chat/completions - OpenAI-compatible chat endpoint.
async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Json<Value>, Response> {
    auth::require_api_key(&headers, &state.config.api_key_list())
        .map_err(|e| e.into_response())?;

    let model = request
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    let data = state
        .dispatcher
        .chat(&model, &request.messages)
        .await
        .map_err(|e| e.into_response())?;

    let content = data
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(Json(json!({
        "id": "infergrid-chat",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content}
        }]
    })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state)
}
