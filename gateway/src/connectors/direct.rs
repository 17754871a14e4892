//! Direct HTTP connector for nodes with a reachable endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{Connector, ConnectorError};

/// Calls a node agent over HTTP directly.
///
/// The highest performance path when a node has a stable, reachable
/// endpoint. Holds one pooled client so connections are reused across
/// calls.
pub struct DirectConnector {
    client: Client,
}

impl DirectConnector {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn post_json(&self, url: String, payload: &Value) -> Result<Value, ConnectorError> {
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        read_json(response).await
    }
}

impl Default for DirectConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for DirectConnector {
    async fn chat(&self, base: &str, payload: Value) -> Result<Value, ConnectorError> {
        self.post_json(node_url(base, "chat"), &payload).await
    }

    async fn embeddings(&self, base: &str, payload: Value) -> Result<Value, ConnectorError> {
        self.post_json(node_url(base, "embeddings"), &payload).await
    }

    async fn models(&self, base: &str) -> Result<Value, ConnectorError> {
        let response = self
            .client
            .get(node_url(base, "models"))
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        read_json(response).await
    }
}

fn node_url(base: &str, op: &str) -> String {
    format!("{}/node/v1/{}", base.trim_end_matches('/'), op)
}

/// Any non-2xx status is a hard failure.
async fn read_json(response: reqwest::Response) -> Result<Value, ConnectorError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ConnectorError::Transport(format!(
            "HTTP {}: {}",
            status, body
        )));
    }
    response
        .json()
        .await
        .map_err(|e| ConnectorError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_posts_to_node_path() {
        let server = MockServer::start().await;
        let payload = json!({"model": "llama3", "messages": []});

        Mock::given(method("POST"))
            .and(path("/node/v1/chat"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "hi"})))
            .mount(&server)
            .await;

        let connector = DirectConnector::new();
        let data = connector.chat(&server.uri(), payload).await.unwrap();
        assert_eq!(data["content"], "hi");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/node/v1/models"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"object": "list", "data": [{"id": "llama3"}]})),
            )
            .mount(&server)
            .await;

        let connector = DirectConnector::new();
        let base = format!("{}/", server.uri());
        let data = connector.models(&base).await.unwrap();
        assert_eq!(data["data"][0]["id"], "llama3");
    }

    #[tokio::test]
    async fn test_non_2xx_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/node/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let connector = DirectConnector::new();
        let result = connector.embeddings(&server.uri(), json!({})).await;
        match result {
            Err(ConnectorError::Transport(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("boom"));
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let connector = DirectConnector::new();
        // Nothing listens here; reqwest fails at connect time.
        let result = connector.chat("http://127.0.0.1:1", json!({})).await;
        assert!(matches!(result, Err(ConnectorError::Transport(_))));
    }
}
