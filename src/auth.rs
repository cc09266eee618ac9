//! Password hashing and bearer-token issuance/verification.
//!
//! Passwords are stored as hex-encoded SHA-256 digests; sessions are carried
//! by HS256 JWTs with `sub`/`iss`/`exp` plus the user id and email as custom
//! claims.

use crate::config::AuthConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Hex-encoded SHA-256 digest of a password.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a candidate password against a stored digest.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// Claims carried by an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub iss: String,
    /// Expiry, seconds since the epoch
    pub exp: u64,
    /// User id
    pub uid: u64,
    pub email: String,
}

/// Issues and verifies bearer tokens with one shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    valid_for: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        TokenCodec {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            valid_for: Duration::from_secs(config.expire_secs),
        }
    }

    /// Issue a token for an authenticated user.
    pub fn issue(&self, uid: u64, username: &str, email: &str) -> anyhow::Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
        let claims = Claims {
            sub: username.to_string(),
            iss: self.issuer.clone(),
            exp: (now + self.valid_for).as_secs(),
            uid,
            email: email.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token's signature, expiry, and issuer.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Resolve the caller's identity from the `Authorization` header.
    ///
    /// Returns the ready-made 401 response on failure so handlers can bail
    /// with `?`-free early returns:
    ///
    /// ```rust,ignore
    /// let claims = match codec.authenticate(req) {
    ///     Ok(claims) => claims,
    ///     Err(response) => return Ok(response),
    /// };
    /// ```
    pub fn authenticate(&self, req: &HandlerRequest) -> Result<Claims, HandlerResponse> {
        let Some(token) = bearer_token(req) else {
            return Err(HandlerResponse::error(401, "Missing bearer token"));
        };
        match self.verify(token) {
            Ok(claims) => Ok(claims),
            Err(e) => {
                debug!(request_id = %req.request_id, error = %e, "Token rejected");
                Err(HandlerResponse::error(401, "Invalid or expired token"))
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(req: &HandlerRequest) -> Option<&str> {
    let value = req.get_header("authorization")?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
