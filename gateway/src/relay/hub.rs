//! Request multiplexer for relay-connected nodes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

use infergrid_common::{GatewayFrame, NodeFrame, ReqFrame, ResFrame};

use crate::registry::NodeRegistry;

/// Errors from relayed requests.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("node not connected")]
    NodeNotConnected,
    #[error("relay request timed out")]
    Timeout,
}

/// One attached tunnel node: its outbound frame channel and the pending
/// request slots awaiting a matching `res`.
struct RelayConn {
    tx: mpsc::Sender<GatewayFrame>,
    pending: HashMap<String, oneshot::Sender<ResFrame>>,
}

/// Multiplexes correlated request/response calls over per-node WebSocket
/// tunnels.
///
/// Many requests can be in flight to the same node at once, each with its
/// own pending slot; responses are matched purely by id, with no ordering
/// guarantee. The hub imposes no per-node concurrency cap - `capacity` on
/// the registry record is advisory only.
pub struct RelayHub {
    registry: Arc<NodeRegistry>,
    // Guards the connection table and the per-connection pending tables.
    // Never held across an await: senders are cloned out before sending.
    conns: Mutex<HashMap<String, RelayConn>>,
}

impl RelayHub {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            conns: Mutex::new(HashMap::new()),
        }
    }

    /// Register the transport handle for a node.
    ///
    /// Idempotent per node id: a second attach replaces the first, dropping
    /// the old connection's pending table. Waiters on dropped slots observe
    /// a closed channel and fail with [`RelayError::NodeNotConnected`];
    /// anything the orphaned handle resolves later finds no slot and is
    /// ignored.
    pub async fn attach(&self, node_id: &str, tx: mpsc::Sender<GatewayFrame>) {
        let mut conns = self.conns.lock().await;
        conns.insert(
            node_id.to_string(),
            RelayConn {
                tx,
                pending: HashMap::new(),
            },
        );
    }

    /// Remove a node's connection and un-register it.
    ///
    /// Detach is the sole authority for removing a tunnel-backed node from
    /// the registry. In-flight requests fail immediately rather than
    /// waiting out their deadline.
    pub async fn detach(&self, node_id: &str) {
        self.conns.lock().await.remove(node_id);
        self.registry.remove(node_id).await;
    }

    /// Whether a connection is currently attached for `node_id`.
    pub async fn connected(&self, node_id: &str) -> bool {
        self.conns.lock().await.contains_key(node_id)
    }

    /// Send `op` with `payload` to a node and await its `res` frame.
    ///
    /// Fails with [`RelayError::NodeNotConnected`] before sending when no
    /// connection is attached. On timeout the pending slot is discarded, so
    /// a late response for the same id is silently dropped.
    pub async fn request(
        &self,
        node_id: &str,
        op: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<ResFrame, RelayError> {
        let req_id = Uuid::new_v4().to_string();
        let (slot_tx, slot_rx) = oneshot::channel();

        let tx = {
            let mut conns = self.conns.lock().await;
            let conn = conns.get_mut(node_id).ok_or(RelayError::NodeNotConnected)?;
            conn.pending.insert(req_id.clone(), slot_tx);
            conn.tx.clone()
        };

        let frame = GatewayFrame::Req(ReqFrame {
            id: req_id.clone(),
            op: op.to_string(),
            payload,
        });
        if tx.send(frame).await.is_err() {
            // Receive loop gone; the detach path will clean the tables.
            self.discard_pending(node_id, &req_id).await;
            return Err(RelayError::NodeNotConnected);
        }

        match tokio::time::timeout(timeout, slot_rx).await {
            Ok(Ok(res)) => Ok(res),
            // Slot dropped: the node detached or was replaced while we waited.
            Ok(Err(_)) => Err(RelayError::NodeNotConnected),
            Err(_) => {
                self.discard_pending(node_id, &req_id).await;
                Err(RelayError::Timeout)
            }
        }
    }

    /// Resolve the pending slot matching a `res` frame, if any.
    ///
    /// Frames of any other type are not the hub's concern (streaming deltas
    /// belong to out-of-band readers) and are ignored, as are responses
    /// whose slot has already been discarded.
    pub async fn handle_frame(&self, node_id: &str, frame: NodeFrame) {
        let NodeFrame::Res(res) = frame else {
            return;
        };

        let slot = {
            let mut conns = self.conns.lock().await;
            conns
                .get_mut(node_id)
                .and_then(|conn| conn.pending.remove(&res.id))
        };
        if let Some(slot) = slot {
            // The waiter may have timed out between lookup and send.
            let _ = slot.send(res);
        }
    }

    async fn discard_pending(&self, node_id: &str, req_id: &str) {
        if let Some(conn) = self.conns.lock().await.get_mut(node_id) {
            conn.pending.remove(req_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConnectorKind, NodeRecord};
    use serde_json::json;

    fn hub() -> (Arc<NodeRegistry>, RelayHub) {
        let registry = Arc::new(NodeRegistry::new());
        let hub = RelayHub::new(registry.clone());
        (registry, hub)
    }

    /// Attach a channel-backed fake node and return its request stream.
    async fn attach_fake(hub: &RelayHub, node_id: &str) -> mpsc::Receiver<GatewayFrame> {
        let (tx, rx) = mpsc::channel(8);
        hub.attach(node_id, tx).await;
        rx
    }

    #[tokio::test]
    async fn test_request_resolves_with_response_body() {
        let (_registry, hub) = hub();
        let mut rx = attach_fake(&hub, "node-1").await;

        let hub = Arc::new(hub);
        let requester = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.request("node-1", "chat", json!({"model": "m"}), Duration::from_secs(5))
                    .await
            })
        };

        // The fake node answers the frame it received.
        let GatewayFrame::Req(req) = rx.recv().await.unwrap() else {
            panic!("Expected req frame");
        };
        assert_eq!(req.op, "chat");
        hub.handle_frame(
            "node-1",
            NodeFrame::Res(ResFrame::success(&req.id, json!({"x": 1}))),
        )
        .await;

        let res = requester.await.unwrap().unwrap();
        assert!(res.ok);
        assert_eq!(res.data.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn test_request_without_connection_fails_fast() {
        let (_registry, hub) = hub();
        let result = hub
            .request("ghost", "chat", json!({}), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(RelayError::NodeNotConnected)));
    }

    #[tokio::test]
    async fn test_request_times_out_and_late_response_is_inert() {
        let (_registry, hub) = hub();
        let mut rx = attach_fake(&hub, "node-1").await;

        let result = hub
            .request("node-1", "chat", json!({}), Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(RelayError::Timeout)));

        // A response arriving after the deadline finds no slot.
        let GatewayFrame::Req(req) = rx.recv().await.unwrap() else {
            panic!("Expected req frame");
        };
        hub.handle_frame(
            "node-1",
            NodeFrame::Res(ResFrame::success(&req.id, json!({}))),
        )
        .await;

        assert!(hub.conns.lock().await.get("node-1").unwrap().pending.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_out_of_order() {
        let (_registry, hub) = hub();
        let mut rx = attach_fake(&hub, "node-1").await;
        let hub = Arc::new(hub);

        let first = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.request("node-1", "chat", json!({"n": 1}), Duration::from_secs(5))
                    .await
            })
        };
        let second = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.request("node-1", "chat", json!({"n": 2}), Duration::from_secs(5))
                    .await
            })
        };

        let GatewayFrame::Req(req_a) = rx.recv().await.unwrap() else {
            panic!("Expected req frame");
        };
        let GatewayFrame::Req(req_b) = rx.recv().await.unwrap() else {
            panic!("Expected req frame");
        };

        // Answer in reverse arrival order; matching is by id, not FIFO.
        hub.handle_frame(
            "node-1",
            NodeFrame::Res(ResFrame::success(&req_b.id, json!({"answer": "b"}))),
        )
        .await;
        hub.handle_frame(
            "node-1",
            NodeFrame::Res(ResFrame::success(&req_a.id, json!({"answer": "a"}))),
        )
        .await;

        assert!(first.await.unwrap().unwrap().ok);
        assert!(second.await.unwrap().unwrap().ok);
    }

    #[tokio::test]
    async fn test_detach_removes_connection_and_registry_record() {
        let (registry, hub) = hub();
        registry
            .upsert(NodeRecord::new("node-1", ConnectorKind::RelayLink))
            .await;
        let _rx = attach_fake(&hub, "node-1").await;

        hub.detach("node-1").await;

        assert!(!hub.connected("node-1").await);
        assert!(registry.get("node-1").await.is_none());

        // No connection, no network: the request fails before sending.
        let result = hub
            .request("node-1", "chat", json!({}), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(RelayError::NodeNotConnected)));
    }

    #[tokio::test]
    async fn test_detach_forecloses_in_flight_requests() {
        let (_registry, hub) = hub();
        let _rx = attach_fake(&hub, "node-1").await;
        let hub = Arc::new(hub);

        let requester = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.request("node-1", "chat", json!({}), Duration::from_secs(30))
                    .await
            })
        };
        // Let the request register its slot before detaching.
        tokio::task::yield_now().await;
        hub.detach("node-1").await;

        let result = requester.await.unwrap();
        assert!(matches!(result, Err(RelayError::NodeNotConnected)));
    }

    #[tokio::test]
    async fn test_reattach_replaces_connection() {
        let (_registry, hub) = hub();
        let _old_rx = attach_fake(&hub, "node-1").await;
        let mut new_rx = attach_fake(&hub, "node-1").await;
        let hub = Arc::new(hub);

        let requester = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.request("node-1", "models", json!({}), Duration::from_secs(5))
                    .await
            })
        };

        // Only the new handle sees the request.
        let GatewayFrame::Req(req) = new_rx.recv().await.unwrap() else {
            panic!("Expected req frame");
        };
        hub.handle_frame(
            "node-1",
            NodeFrame::Res(ResFrame::success(&req.id, json!({"data": []}))),
        )
        .await;
        assert!(requester.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_non_res_frames_ignored() {
        let (_registry, hub) = hub();
        let _rx = attach_fake(&hub, "node-1").await;

        // Streaming frames are not the hub's concern.
        hub.handle_frame(
            "node-1",
            NodeFrame::Delta {
                id: "r".to_string(),
                content: "tok".to_string(),
            },
        )
        .await;
        hub.handle_frame("node-1", NodeFrame::Done { id: "r".to_string() })
            .await;

        assert!(hub.connected("node-1").await);
    }
}
