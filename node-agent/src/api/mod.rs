//! Direct HTTP surface for the node agent.
//!
//! The gateway's direct connector calls these endpoints when a node is
//! reachable without the relay.

pub mod chat;
pub mod embeddings;
pub mod health;
pub mod models;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the /node/v1 router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(embeddings::router())
        .merge(models::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LocalRuntime;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(runtime_url: &str) -> Router {
        let state = Arc::new(AppState::new(Arc::new(LocalRuntime::new(runtime_url))));
        Router::new().nest("/node/v1", router()).with_state(state)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_chat_endpoint_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "direct hello"}
            })))
            .mount(&server)
            .await;

        let app = app(&server.uri());
        let (status, body) = post_json(
            &app,
            "/node/v1/chat",
            json!({"model": "llama3", "messages": [{"role": "user", "content": "hi"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "direct hello");
    }

    #[tokio::test]
    async fn test_chat_endpoint_maps_runtime_failure() {
        // Unreachable runtime: the handler answers 502, it does not hang.
        let app = app("http://127.0.0.1:1");
        let (status, body) = post_json(
            &app,
            "/node/v1/chat",
            json!({"model": "llama3", "messages": []}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "communication_error");
    }

    #[tokio::test]
    async fn test_models_endpoint_lists_runtime_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"models": [{"name": "llama3:8b"}]})),
            )
            .mount(&server)
            .await;

        let app = app(&server.uri());
        let request = Request::builder()
            .uri("/node/v1/models")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"][0]["id"], "llama3:8b");
    }
}
