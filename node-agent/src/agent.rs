//! Outbound relay link to the gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use infergrid_common::{GatewayFrame, Hello, NodeFrame};

use crate::config::GatewayConfig;
use crate::ops::execute_op;
use crate::runtime::LocalRuntime;

/// Relay client for the gateway connection.
///
/// Handles connection lifecycle, the hello handshake, and request
/// execution. Each inbound request runs in its own task so slow ops do not
/// block the link; replies funnel through an outbound channel.
pub struct RelayAgent {
    config: GatewayConfig,
    node_id: String,
    tags: Vec<String>,
    capacity: u32,
    runtime: Arc<LocalRuntime>,
}

impl RelayAgent {
    pub fn new(
        config: GatewayConfig,
        node_id: String,
        tags: Vec<String>,
        capacity: u32,
        runtime: Arc<LocalRuntime>,
    ) -> Self {
        Self {
            config,
            node_id,
            tags,
            capacity,
            runtime,
        }
    }

    /// Run the agent with automatic reconnection.
    ///
    /// This runs indefinitely, reconnecting on connection loss.
    pub async fn run(&self) {
        loop {
            tracing::info!("Connecting to gateway at {}", self.config.control_url);

            match self.connect_and_run().await {
                Ok(()) => {
                    tracing::info!("Gateway connection closed normally");
                }
                Err(e) => {
                    tracing::error!("Gateway connection error: {}", e);
                }
            }

            tracing::info!(
                "Reconnecting in {} seconds...",
                self.config.reconnect_delay_secs
            );
            tokio::time::sleep(Duration::from_secs(self.config.reconnect_delay_secs)).await;
        }
    }

    /// Connect, attach, and serve requests until the link drops.
    async fn connect_and_run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/relay/connect?token={}",
            self.config.control_url.trim_end_matches('/'),
            self.config.token
        );
        let (ws_stream, _) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Advertise what this node serves.
        let models = self.runtime.list_models().await;
        let mut meta = HashMap::new();
        meta.insert("platform".to_string(), std::env::consts::OS.to_string());

        let hello = NodeFrame::Hello(Hello {
            node_id: Some(self.node_id.clone()),
            tags: self.tags.clone(),
            models,
            capacity: self.capacity,
            meta,
        });
        write.send(Message::Text(serde_json::to_string(&hello)?)).await?;

        // Wait for the attach confirmation.
        match timeout(Duration::from_secs(10), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                match serde_json::from_str::<GatewayFrame>(&text)? {
                    GatewayFrame::HelloAck { node_id } => {
                        tracing::info!("Attached to gateway as {}", node_id);
                    }
                    _ => return Err("Unexpected response to hello".into()),
                }
            }
            Ok(Some(Ok(Message::Close(frame)))) => {
                return Err(format!("Gateway refused enrollment: {:?}", frame).into());
            }
            Ok(Some(Ok(_))) => return Err("Expected text frame for hello ack".into()),
            Ok(Some(Err(e))) => return Err(format!("WebSocket error during hello: {}", e).into()),
            Ok(None) => return Err("Connection closed during hello".into()),
            Err(_) => return Err("Hello acknowledgment timeout".into()),
        }

        // Channel for outbound frames; request tasks clone the sender.
        let (tx, mut rx) = mpsc::channel::<NodeFrame>(32);

        loop {
            tokio::select! {
                // Outbound replies
                Some(frame) = rx.recv() => {
                    write.send(Message::Text(serde_json::to_string(&frame)?)).await?;
                }

                // Inbound requests
                Some(result) = read.next() => {
                    match result {
                        Ok(Message::Text(text)) => {
                            self.handle_gateway_frame(&text, &tx);
                        }
                        Ok(Message::Ping(data)) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Ok(Message::Close(_)) => {
                            tracing::info!("Gateway sent close frame");
                            return Ok(());
                        }
                        Ok(_) => {} // Ignore binary, pong, etc.
                        Err(e) => {
                            return Err(format!("WebSocket error: {}", e).into());
                        }
                    }
                }

                else => {
                    return Ok(());
                }
            }
        }
    }

    /// Spawn execution for a request frame.
    ///
    /// Parse failures are logged and skipped; an op failure is reported in
    /// the `res` frame, never by dropping the link.
    fn handle_gateway_frame(&self, text: &str, tx: &mpsc::Sender<NodeFrame>) {
        let frame = match serde_json::from_str::<GatewayFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Malformed gateway frame: {}", e);
                return;
            }
        };

        match frame {
            GatewayFrame::Req(req) => {
                let runtime = self.runtime.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let res = execute_op(&runtime, req).await;
                    if tx.send(NodeFrame::Res(res)).await.is_err() {
                        tracing::debug!("Link closed before reply could be sent");
                    }
                });
            }
            GatewayFrame::HelloAck { node_id } => {
                tracing::warn!("Unexpected hello_ack for {} after attach", node_id);
            }
        }
    }
}
