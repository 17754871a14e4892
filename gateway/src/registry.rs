//! Node registry for tracking live compute nodes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// How the gateway reaches a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Routed by node id through the relay hub.
    RelayLink,
    /// Node has its own reachable HTTP endpoint.
    DirectEndpoint,
    /// Runtime colocated with the gateway process.
    Local,
}

/// In-memory, real-time view of a known node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    /// Unique node identifier.
    pub node_id: String,
    pub connector_kind: ConnectorKind,
    /// Base URL for direct/local nodes; absent for relay links.
    pub endpoint: Option<String>,
    /// Capability tags for routing.
    pub tags: Vec<String>,
    /// Models the node claims to serve.
    pub models: Vec<String>,
    /// Concurrent-request capacity hint (advisory, not enforced).
    pub capacity: u32,
    /// Open provenance map (e.g. via: local|relay).
    pub meta: HashMap<String, String>,
    /// Refreshed on every liveness signal.
    pub last_seen: DateTime<Utc>,
    /// Set false by external health probes.
    pub healthy: bool,
}

impl NodeRecord {
    /// Build a record with fresh liveness and default health.
    pub fn new(node_id: impl Into<String>, connector_kind: ConnectorKind) -> Self {
        Self {
            node_id: node_id.into(),
            connector_kind,
            endpoint: None,
            tags: vec![],
            models: vec![],
            capacity: 1,
            meta: HashMap::new(),
            last_seen: Utc::now(),
            healthy: true,
        }
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

/// Registry of currently known nodes.
///
/// Strictly a real-time view: rebuilt as nodes (re)connect, never
/// persisted. Every operation is a single critical section; callers that
/// need read-then-act (the router) must tolerate staleness between the
/// snapshot and the action.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, NodeRecord>>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or wholesale-replace the record for `node.node_id`,
    /// stamping `last_seen`.
    pub async fn upsert(&self, mut node: NodeRecord) {
        node.last_seen = Utc::now();
        self.nodes.write().await.insert(node.node_id.clone(), node);
    }

    /// Refresh a node's liveness, optionally overwriting its health.
    ///
    /// Unknown ids are ignored: a race between detach and a final
    /// in-flight message must not resurrect state.
    pub async fn touch(&self, node_id: &str, healthy: Option<bool>) {
        if let Some(node) = self.nodes.write().await.get_mut(node_id) {
            node.last_seen = Utc::now();
            if let Some(healthy) = healthy {
                node.healthy = healthy;
            }
        }
    }

    /// Delete the record if present.
    pub async fn remove(&self, node_id: &str) -> Option<NodeRecord> {
        self.nodes.write().await.remove(node_id)
    }

    /// Point-in-time snapshot of one node.
    pub async fn get(&self, node_id: &str) -> Option<NodeRecord> {
        self.nodes.read().await.get(node_id).cloned()
    }

    /// Point-in-time snapshot of all nodes; a copy, never a live view.
    pub async fn list(&self) -> Vec<NodeRecord> {
        self.nodes.read().await.values().cloned().collect()
    }

    /// Count known nodes.
    pub async fn count(&self) -> usize {
        self.nodes.read().await.len()
    }
}
