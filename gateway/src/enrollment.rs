//! Enrollment tokens that authorize a node to attach to the relay.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

// Stable salt so tokens remain verifiable across restarts but never
// across deployments with a different application.
const ENROLL_SALT: &str = "infergrid.enroll.v1";

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
}

/// A short-lived token a node presents when enrolling.
///
/// Tokens are bearer credentials; protect them like passwords. They are
/// stateless and not single-use: any unexpired, correctly signed token can
/// enroll until it expires.
#[derive(Debug, Clone, Serialize)]
pub struct JoinToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signed claims inside a join token.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinClaims {
    pub nonce: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies join tokens with a process-wide secret.
pub struct EnrollmentAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl: Duration,
}

impl EnrollmentAuthority {
    pub fn new(secret: &str, default_ttl: Duration) -> Self {
        // Derive the signing key from secret and salt so tokens cannot be
        // replayed across deployments sharing a secret by accident.
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(ENROLL_SALT.as_bytes());
        let key = hasher.finalize();

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            default_ttl,
        }
    }

    /// Create a signed token valid for `ttl` (or the configured default).
    pub fn create_join_token(&self, ttl: Option<Duration>) -> JoinToken {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());

        let mut nonce_bytes = [0u8; 16];
        rand::thread_rng().fill(&mut nonce_bytes);

        let claims = JoinClaims {
            nonce: hex::encode(nonce_bytes),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .expect("HS256 signing cannot fail");

        JoinToken { token, expires_at }
    }

    /// Verify a join token and return its claims.
    pub fn verify_join_token(&self, token: &str) -> Result<JoinClaims, EnrollError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data =
            decode::<JoinClaims>(token, &self.decoding_key, &validation).map_err(|e| match e
                .kind()
            {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => EnrollError::TokenExpired,
                _ => EnrollError::InvalidToken,
            })?;

        if data.claims.nonce.is_empty() {
            return Err(EnrollError::InvalidToken);
        }
        Ok(data.claims)
    }
}
