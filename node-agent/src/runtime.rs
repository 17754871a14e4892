//! Adapter around an Ollama-style HTTP runtime.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use infergrid_common::ChatMessage;

use crate::error::{Error, Result};

/// Minimal client for the local inference runtime.
pub struct LocalRuntime {
    client: Client,
    base_url: String,
}

// ============================================================================
// Runtime API types
// ============================================================================

#[derive(Debug, Serialize)]
struct RuntimeChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct RuntimeChatResponse {
    #[serde(default)]
    message: Option<RuntimeResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct RuntimeResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct RuntimeEmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct RuntimeEmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f64>,
}

/// Response from /api/tags endpoint.
#[derive(Debug, Deserialize)]
struct RuntimeTagsResponse {
    #[serde(default)]
    models: Vec<RuntimeModelInfo>,
}

#[derive(Debug, Deserialize)]
struct RuntimeModelInfo {
    #[serde(default)]
    name: Option<String>,
}

impl LocalRuntime {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run a non-streaming chat turn and return the assistant content.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = RuntimeChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;
        let body: RuntimeChatResponse = read_json(response).await?;

        Ok(body
            .message
            .and_then(|m| m.content)
            .unwrap_or_default())
    }

    /// Embed a single input string.
    pub async fn embeddings(&self, model: &str, input: &str) -> Result<Vec<f64>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = RuntimeEmbeddingsRequest {
            model,
            prompt: input,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;
        let body: RuntimeEmbeddingsResponse = read_json(response).await?;

        Ok(body.embedding)
    }

    /// List model names, best-effort: failures yield an empty list.
    pub async fn list_models(&self) -> Vec<String> {
        let url = format!("{}/api/tags", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Model listing failed: {}", e);
                return vec![];
            }
        };
        let body: RuntimeTagsResponse = match read_json(response).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Model listing failed: {}", e);
                return vec![];
            }
        };

        body.models.into_iter().filter_map(|m| m.name).collect()
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Runtime(format!("HTTP {}: {}", status, body)));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Communication(e.to_string()))
}
