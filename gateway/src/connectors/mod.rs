//! Transport strategies for reaching nodes.
//!
//! The dispatch layer reads a node's connector kind and picks the matching
//! transport: direct HTTP for nodes with a reachable endpoint (the `local`
//! kind reuses the same HTTP shape against a colocated agent), or the relay
//! hub for tunnel-backed nodes.

mod direct;

pub use direct::DirectConnector;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors from connector transports.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("transport error: {0}")]
    Transport(String),
}

/// A connector knows how to execute a request against a runtime node.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Execute a chat request and return the upstream JSON.
    async fn chat(&self, base: &str, payload: Value) -> Result<Value, ConnectorError>;

    /// Execute an embeddings request and return the upstream JSON.
    async fn embeddings(&self, base: &str, payload: Value) -> Result<Value, ConnectorError>;

    /// Best-effort list models.
    async fn models(&self, _base: &str) -> Result<Value, ConnectorError> {
        Ok(json!({"object": "list", "data": []}))
    }
}
