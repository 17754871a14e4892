//! Error types for the node agent.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors from runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Runtime communication error: {0}")]
    Communication(String),

    #[error("Runtime returned error: {0}")]
    Runtime(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Communication(_) => (StatusCode::BAD_GATEWAY, "communication_error"),
            Error::Runtime(_) => (StatusCode::INTERNAL_SERVER_ERROR, "runtime_error"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
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

pub type Result<T> = std::result::Result<T, Error>;
