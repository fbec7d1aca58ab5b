//! GitHub App assertion signing.
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Lifetime of an app assertion, in seconds.
pub const APP_JWT_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    pub fn new(app_id: &str, now: i64) -> Self {
        Self {
            iat: now,
            exp: now + APP_JWT_TTL_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Parses a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
pub fn parse_private_key(pem: &str) -> Result<EncodingKey, AgentError> {
    EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(AgentError::PrivateKey)
}

/// Signs an RS256 assertion for `app_id` issued at `now` (unix seconds).
pub fn sign_app_jwt(private_key_pem: &str, app_id: &str, now: i64) -> Result<String, AgentError> {
    let key = parse_private_key(private_key_pem)?;
    encode(&Header::new(Algorithm::RS256), &AppClaims::new(app_id, now), &key)
        .map_err(AgentError::Sign)
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
