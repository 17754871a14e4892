//! Infergrid gateway - a control plane that dispatches LLM inference
//! requests to compute nodes reachable over direct HTTP or an outbound
//! WebSocket relay.

pub mod auth;
pub mod config;
pub mod connectors;
pub mod dispatch;
pub mod enrollment;
pub mod error;
pub mod logging;
pub mod registry;
pub mod relay;
pub mod router;
pub mod routes;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use enrollment::{EnrollmentAuthority, JoinToken};
pub use error::DispatchError;
pub use registry::{ConnectorKind, NodeRecord, NodeRegistry};
pub use relay::{RelayError, RelayHub, RelayState};
pub use router::{NodeRouter, RouteDecision, RouterError};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
///
/// All core components are constructed here once and passed by handle;
/// nothing is reached through ambient globals, so tests can build
/// isolated instances freely.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<NodeRegistry>,
    pub hub: Arc<RelayHub>,
    pub dispatcher: Arc<Dispatcher>,
    pub enrollment: Arc<EnrollmentAuthority>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let hub = Arc::new(RelayHub::new(registry.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            NodeRouter::new(registry.clone()),
            hub.clone(),
            Duration::from_secs(config.request_timeout_secs),
        ));
        let enrollment = Arc::new(EnrollmentAuthority::new(
            &config.enrollment_secret,
            Duration::from_secs(config.enrollment_ttl_secs),
        ));

        Self {
            config,
            registry,
            hub,
            dispatcher,
            enrollment,
        }
    }

    /// Register the colocated node agent as a local node.
    pub async fn register_local_node(&self) {
        let mut meta = HashMap::new();
        meta.insert("via".to_string(), "local".to_string());

        self.registry
            .upsert(NodeRecord {
                endpoint: Some(self.config.local_node_endpoint.clone()),
                tags: self.config.local_node_tag_list(),
                meta,
                ..NodeRecord::new(self.config.local_node_id.clone(), ConnectorKind::Local)
            })
            .await;

        tracing::info!(
            "Registered local node {} at {}",
            self.config.local_node_id,
            self.config.local_node_endpoint
        );
    }
}

/// Build the full HTTP application.
pub fn build_app(state: Arc<AppState>) -> axum::Router {
    let cors = cors_layer(&state.config.cors_origins);

    let mut app = axum::Router::new()
        .merge(routes::health::router(state.clone()))
        .merge(routes::chat::router(state.clone()))
        .merge(routes::embeddings::router(state.clone()))
        .merge(routes::models::router(state.clone()))
        .nest("/admin", routes::admin::router(state.clone()));

    if state.config.relay_enabled {
        let relay_state = Arc::new(RelayState {
            registry: state.registry.clone(),
            hub: state.hub.clone(),
            enrollment: state.enrollment.clone(),
        });
        app = app.merge(
            axum::Router::new()
                .route("/relay/connect", get(relay::relay_handler))
                .with_state(relay_state),
        );
    }

    app.layer(axum::middleware::from_fn(logging::request_logger))
        .layer(cors)
}

fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
