//! Uniform dispatch over connector kinds.
//!
//! The front door never cares how a node is reached: it asks the router
//! for a node, and the dispatcher picks the matching transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use infergrid_common::protocol::ops;
use infergrid_common::ChatMessage;

use crate::connectors::{Connector, DirectConnector};
use crate::error::DispatchError;
use crate::registry::ConnectorKind;
use crate::relay::RelayHub;
use crate::router::NodeRouter;

/// Dispatches opaque chat/embeddings/list-models requests to whichever
/// node the router selects.
pub struct Dispatcher {
    router: NodeRouter,
    hub: Arc<RelayHub>,
    direct: DirectConnector,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(router: NodeRouter, hub: Arc<RelayHub>, request_timeout: Duration) -> Self {
        Self {
            router,
            hub,
            direct: DirectConnector::new(),
            request_timeout,
        }
    }

    /// Route a chat request and return the upstream JSON.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Value, DispatchError> {
        let payload = json!({"model": model, "messages": messages});
        self.execute(Some(model), ops::CHAT, payload).await
    }

    /// Route an embeddings request and return the upstream JSON.
    pub async fn embeddings(&self, model: &str, input: &str) -> Result<Value, DispatchError> {
        let payload = json!({"model": model, "input": input});
        self.execute(Some(model), ops::EMBEDDINGS, payload).await
    }

    /// Aggregate models, best-effort from one healthy node.
    ///
    /// The one place a failure is deliberately swallowed: an empty list
    /// substitutes for an error on this display path.
    pub async fn models(&self) -> Value {
        match self.execute(None, ops::MODELS, json!({})).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Model listing failed: {}", e);
                json!({"object": "list", "data": []})
            }
        }
    }

    async fn execute(
        &self,
        model: Option<&str>,
        op: &str,
        payload: Value,
    ) -> Result<Value, DispatchError> {
        // Model capability is a hint here, not a filter (require_model is
        // off on the common path).
        let decision = self.router.choose_node(model, false).await?;
        let node = decision.node;

        tracing::debug!(
            "Dispatching {} to node {} via {:?}",
            op,
            node.node_id,
            node.connector_kind
        );

        match node.connector_kind {
            ConnectorKind::RelayLink => {
                let res = self
                    .hub
                    .request(&node.node_id, op, payload, self.request_timeout)
                    .await?;
                if !res.ok {
                    return Err(DispatchError::Upstream(
                        res.error.unwrap_or_else(|| "upstream error".to_string()),
                    ));
                }
                Ok(res.data.unwrap_or(Value::Null))
            }
            // Local nodes speak the same HTTP shape as direct endpoints.
            ConnectorKind::DirectEndpoint | ConnectorKind::Local => {
                let base = node.endpoint.clone().unwrap_or_default();
                let data = match op {
                    ops::CHAT => self.direct.chat(&base, payload).await?,
                    ops::EMBEDDINGS => self.direct.embeddings(&base, payload).await?,
                    _ => self.direct.models(&base).await?,
                };
                Ok(data)
            }
        }
    }
}
