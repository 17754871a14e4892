//! API-key authentication for the front door and admin surface.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or missing API key")]
    InvalidApiKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "type": "unauthorized",
                "message": self.to_string()
            }
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Validate the caller's API key.
///
/// Accepts either:
/// - `X-Api-Key: <key>`
/// - `Authorization: Bearer <key>`
///
/// Returns the validated key string.
pub fn require_api_key(headers: &HeaderMap, valid_keys: &[String]) -> Result<String, AuthError> {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
            let (scheme, rest) = value.split_once(' ')?;
            if scheme.eq_ignore_ascii_case("bearer") {
                Some(rest.trim().to_string())
            } else {
                None
            }
        });

    match key {
        Some(key) if !key.is_empty() && valid_keys.iter().any(|v| v == &key) => Ok(key),
        _ => Err(AuthError::InvalidApiKey),
    }
}
