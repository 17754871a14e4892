//! Execution of relay ops against the local runtime.

use serde::Deserialize;
use serde_json::json;

use infergrid_common::protocol::ops;
use infergrid_common::{ChatMessage, ReqFrame, ResFrame};

use crate::runtime::LocalRuntime;

/// Payload of a `chat` op.
#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Payload of an `embeddings` op.
#[derive(Debug, Deserialize)]
pub struct EmbeddingsPayload {
    pub model: String,
    #[serde(default)]
    pub input: String,
}

/// Answer one request frame with exactly one response frame.
///
/// Every failure - unknown op, malformed payload, runtime error - becomes
/// an `ok:false` frame. Nothing here may take down the receive loop: a
/// crash would orphan every other request in flight on the connection.
pub async fn execute_op(runtime: &LocalRuntime, req: ReqFrame) -> ResFrame {
    match req.op.as_str() {
        ops::CHAT => {
            let payload: ChatPayload = match serde_json::from_value(req.payload) {
                Ok(payload) => payload,
                Err(e) => return ResFrame::failure(req.id, format!("bad chat payload: {}", e)),
            };
            match runtime.chat(&payload.model, &payload.messages).await {
                Ok(content) => ResFrame::success(req.id, json!({"content": content})),
                Err(e) => ResFrame::failure(req.id, e.to_string()),
            }
        }

        ops::EMBEDDINGS => {
            let payload: EmbeddingsPayload = match serde_json::from_value(req.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    return ResFrame::failure(req.id, format!("bad embeddings payload: {}", e))
                }
            };
            match runtime.embeddings(&payload.model, &payload.input).await {
                Ok(embedding) => ResFrame::success(req.id, json!({"embedding": embedding})),
                Err(e) => ResFrame::failure(req.id, e.to_string()),
            }
        }

        ops::MODELS => {
            let models = runtime.list_models().await;
            let data: Vec<_> = models
                .into_iter()
                .map(|id| json!({"id": id, "object": "model"}))
                .collect();
            ResFrame::success(req.id, json!({"object": "list", "data": data}))
        }

        other => ResFrame::failure(req.id, format!("unknown op: {}", other)),
    }
}
