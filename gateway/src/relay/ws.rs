//! WebSocket endpoint for node relay connections.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use infergrid_common::{
    GatewayFrame, NodeFrame, CLOSE_INVALID_TOKEN, CLOSE_MISSING_TOKEN, CLOSE_PROTOCOL_ERROR,
};

use super::RelayHub;
use crate::enrollment::EnrollmentAuthority;
use crate::registry::{ConnectorKind, NodeRecord, NodeRegistry};

/// Shared state for relay connections.
pub struct RelayState {
    pub registry: Arc<NodeRegistry>,
    pub hub: Arc<RelayHub>,
    pub enrollment: Arc<EnrollmentAuthority>,
}

/// Token comes via query param to keep the node bootstrap command simple.
#[derive(Debug, Deserialize)]
pub struct RelayParams {
    #[serde(default)]
    token: Option<String>,
}

/// WebSocket upgrade handler for `/relay/connect`.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<RelayParams>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_node(socket, state, params.token))
}

/// Handle an individual node connection.
async fn handle_node(socket: WebSocket, state: Arc<RelayState>, token: Option<String>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Token gate before any frame exchange.
    let Some(token) = token else {
        let _ = close(&mut ws_tx, CLOSE_MISSING_TOKEN, "missing token").await;
        return;
    };
    if let Err(e) = state.enrollment.verify_join_token(&token) {
        tracing::warn!("Relay enrollment rejected: {}", e);
        let _ = close(&mut ws_tx, CLOSE_INVALID_TOKEN, "invalid token").await;
        return;
    }

    // Expect hello first.
    let hello = match timeout(Duration::from_secs(10), ws_rx.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<NodeFrame>(&text) {
            Ok(NodeFrame::Hello(hello)) => hello,
            Ok(_) => {
                tracing::warn!("Expected hello as first relay frame");
                let _ = close(&mut ws_tx, CLOSE_PROTOCOL_ERROR, "expected hello").await;
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to parse hello frame: {}", e);
                let _ = close(&mut ws_tx, CLOSE_PROTOCOL_ERROR, "malformed hello").await;
                return;
            }
        },
        Ok(Some(Ok(_))) => {
            let _ = close(&mut ws_tx, CLOSE_PROTOCOL_ERROR, "expected text frame").await;
            return;
        }
        Ok(Some(Err(e))) => {
            tracing::warn!("WebSocket error before hello: {}", e);
            return;
        }
        Ok(None) => {
            tracing::info!("Relay connection closed before hello");
            return;
        }
        Err(_) => {
            tracing::warn!("Timed out waiting for hello frame");
            let _ = close(&mut ws_tx, CLOSE_PROTOCOL_ERROR, "hello timeout").await;
            return;
        }
    };

    // Server assigns an id when the node did not bring a stable one.
    let node_id = hello
        .node_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Channel for outbound frames to this node.
    let (tx, mut rx) = mpsc::channel::<GatewayFrame>(32);
    state.hub.attach(&node_id, tx).await;

    let mut meta = hello.meta.clone();
    meta.insert("via".to_string(), "relay".to_string());
    state
        .registry
        .upsert(NodeRecord {
            endpoint: None,
            tags: hello.tags.clone(),
            models: hello.models.clone(),
            capacity: hello.capacity,
            meta,
            ..NodeRecord::new(node_id.clone(), ConnectorKind::RelayLink)
        })
        .await;

    tracing::info!(
        "Node {} attached over relay ({} models, capacity {})",
        node_id,
        hello.models.len(),
        hello.capacity
    );

    let ack = GatewayFrame::HelloAck {
        node_id: node_id.clone(),
    };
    if let Err(e) = send_frame(&mut ws_tx, &ack).await {
        tracing::error!("Failed to send hello_ack to {}: {}", node_id, e);
        state.hub.detach(&node_id).await;
        return;
    }

    // Main frame loop.
    loop {
        tokio::select! {
            // Outbound frames (hub requests to this node)
            Some(frame) = rx.recv() => {
                if let Err(e) = send_frame(&mut ws_tx, &frame).await {
                    tracing::error!("Failed to send frame to {}: {}", node_id, e);
                    break;
                }
            }

            // Inbound frames (responses, liveness)
            Some(result) = ws_rx.next() => {
                match result {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<NodeFrame>(&text) {
                            Ok(frame) => {
                                state.hub.handle_frame(&node_id, frame).await;
                                state.registry.touch(&node_id, None).await;
                            }
                            Err(e) => {
                                tracing::warn!("Malformed frame from {}: {}", node_id, e);
                                break;
                            }
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Node {} sent close frame", node_id);
                        break;
                    }
                    Ok(_) => {} // Ignore binary, pong, etc.
                    Err(e) => {
                        tracing::error!("WebSocket error from {}: {}", node_id, e);
                        break;
                    }
                }
            }

            else => break,
        }
    }

    // Every exit path ends here: connection and registry record are
    // cleaned up exactly once.
    state.hub.detach(&node_id).await;
    tracing::info!("Node {} detached", node_id);
}

/// Serialize and send a gateway frame.
async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &GatewayFrame,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = serde_json::to_string(frame)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

/// Close the socket with a distinguishing code before any frame exchange.
async fn close(
    sink: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &'static str,
) -> Result<(), axum::Error> {
    sink.send(Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    })))
    .await
}
