//! Infergrid node agent - serves inference ops over the relay link and a
//! direct HTTP endpoint.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod agent;
mod api;
mod config;
mod error;
mod ops;
mod runtime;
mod state;

use agent::RelayAgent;
use config::Config;
use runtime::LocalRuntime;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| format!("Failed to load configuration: {}", e))?;
    let node_id = config.node_id();
    tracing::info!("Starting infergrid-node: {}", node_id);

    let runtime = Arc::new(LocalRuntime::new(&config.runtime.base_url));

    // Start the relay agent if a gateway is configured
    if let Some(ref gateway_config) = config.gateway {
        let agent = RelayAgent::new(
            gateway_config.clone(),
            node_id.clone(),
            config.node.tags.clone(),
            config.node.capacity,
            runtime.clone(),
        );
        tokio::spawn(async move {
            agent.run().await;
        });
        tracing::info!(
            "Relay agent started, connecting to {}",
            gateway_config.control_url
        );
    } else {
        tracing::info!("No gateway configured, serving direct endpoint only");
    }

    // Build router
    let state = Arc::new(AppState::new(runtime));
    let app = Router::new()
        .nest("/node/v1", api::router())
        .route("/health", get(api::health::health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
