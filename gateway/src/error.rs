//! Dispatch error taxonomy surfaced to the HTTP front door.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::connectors::ConnectorError;
use crate::relay::RelayError;
use crate::router::RouterError;

/// A typed dispatch failure.
///
/// Nothing here is swallowed: every failure reaches the caller, which
/// decides whether to retry, pick another node, or report upstream.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// The request was delivered but the remote side reported `ok:false`.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            DispatchError::Router(RouterError::NoHealthyRuntime) => {
                (StatusCode::SERVICE_UNAVAILABLE, "no_healthy_runtime")
            }
            DispatchError::Relay(RelayError::NodeNotConnected) => {
                (StatusCode::BAD_GATEWAY, "node_not_connected")
            }
            DispatchError::Relay(RelayError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "timeout")
            }
            DispatchError::Connector(ConnectorError::Transport(_)) => {
                (StatusCode::BAD_GATEWAY, "transport_error")
            }
            DispatchError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}
