//! Node selection for inbound requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::registry::{NodeRecord, NodeRegistry};

/// Errors from node selection.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no healthy runtimes available")]
    NoHealthyRuntime,
}

/// Ephemeral result of a routing decision.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub node: NodeRecord,
}

/// Selects a node for a request.
///
/// Intentionally simple: health filter, optional model filter, round-robin
/// over a stable order. Extension points: tag-based routing, weighted load
/// balancing, latency-aware selection, capacity enforcement.
pub struct NodeRouter {
    registry: Arc<NodeRegistry>,
    rr_counter: AtomicU64,
}

impl NodeRouter {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            rr_counter: AtomicU64::new(0),
        }
    }

    /// Pick one node by policy.
    ///
    /// The common dispatch path passes `require_model = false`, so the
    /// model name is only a hint for connectors, not a filter. Candidates
    /// are sorted by node id so round-robin order does not depend on map
    /// iteration order; the counter advances unconditionally, which means
    /// membership changes between calls can skip or repeat nodes.
    pub async fn choose_node(
        &self,
        model: Option<&str>,
        require_model: bool,
    ) -> Result<RouteDecision, RouterError> {
        let mut candidates: Vec<NodeRecord> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|n| n.healthy)
            .collect();

        if require_model {
            if let Some(model) = model {
                candidates.retain(|n| n.has_model(model));
            }
        }

        if candidates.is_empty() {
            return Err(RouterError::NoHealthyRuntime);
        }

        candidates.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let counter = self.rr_counter.fetch_add(1, Ordering::Relaxed);
        let idx = (counter % candidates.len() as u64) as usize;
        Ok(RouteDecision {
            node: candidates.swap_remove(idx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectorKind;

    fn node(id: &str, models: Vec<&str>, healthy: bool) -> NodeRecord {
        NodeRecord {
            models: models.into_iter().map(String::from).collect(),
            healthy,
            ..NodeRecord::new(id, ConnectorKind::RelayLink)
        }
    }

    async fn registry_with(nodes: Vec<NodeRecord>) -> Arc<NodeRegistry> {
        let registry = Arc::new(NodeRegistry::new());
        for n in nodes {
            registry.upsert(n).await;
        }
        registry
    }

    #[tokio::test]
    async fn test_no_nodes_fails() {
        let router = NodeRouter::new(Arc::new(NodeRegistry::new()));
        let result = router.choose_node(None, false).await;
        assert!(matches!(result, Err(RouterError::NoHealthyRuntime)));
    }

    #[tokio::test]
    async fn test_unhealthy_nodes_filtered() {
        let registry = registry_with(vec![node("a", vec!["m"], false)]).await;
        let router = NodeRouter::new(registry);
        let result = router.choose_node(Some("m"), false).await;
        assert!(matches!(result, Err(RouterError::NoHealthyRuntime)));
    }

    #[tokio::test]
    async fn test_round_robin_is_deterministic() {
        let registry =
            registry_with(vec![node("b", vec!["m"], true), node("a", vec!["m"], true)]).await;
        let router = NodeRouter::new(registry);

        // Stable node_id order, independent of insertion order.
        let mut picked = vec![];
        for _ in 0..4 {
            picked.push(router.choose_node(Some("m"), false).await.unwrap().node.node_id);
        }
        assert_eq!(picked, vec!["a", "b", "a", "b"]);
    }

    #[tokio::test]
    async fn test_each_node_visited_once_per_cycle() {
        let registry = registry_with(vec![
            node("n1", vec![], true),
            node("n2", vec![], true),
            node("n3", vec![], true),
        ])
        .await;
        let router = NodeRouter::new(registry);

        let mut seen = vec![];
        for _ in 0..3 {
            seen.push(router.choose_node(None, false).await.unwrap().node.node_id);
        }
        seen.sort();
        assert_eq!(seen, vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_require_model_filters_candidates() {
        let registry = registry_with(vec![
            node("a", vec!["llama3"], true),
            node("b", vec!["qwen"], true),
        ])
        .await;
        let router = NodeRouter::new(registry);

        for _ in 0..3 {
            let decision = router.choose_node(Some("qwen"), true).await.unwrap();
            assert_eq!(decision.node.node_id, "b");
        }
    }

    #[tokio::test]
    async fn test_require_model_with_no_match_fails() {
        let registry = registry_with(vec![node("a", vec!["llama3"], true)]).await;
        let router = NodeRouter::new(registry);
        let result = router.choose_node(Some("qwen"), true).await;
        assert!(matches!(result, Err(RouterError::NoHealthyRuntime)));
    }

    // The dispatch path deliberately passes require_model=false, so a node
    // that does not advertise the model is still eligible. This is the
    // documented default, not an accident.
    #[tokio::test]
    async fn test_chat_path_ignores_model_capability() {
        let registry = registry_with(vec![node("a", vec!["llama3"], true)]).await;
        let router = NodeRouter::new(registry);

        let decision = router.choose_node(Some("qwen"), false).await.unwrap();
        assert_eq!(decision.node.node_id, "a");
    }
}
