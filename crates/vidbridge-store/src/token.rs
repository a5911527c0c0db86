//! Bearer token minting and verification
//!
//! Tokens are HMAC-signed (HS256) and carry only `userId` plus standard
//! `iat`/`exp` claims. TTL is exactly 7 days. Shared between the REST
//! surface and the socket handshake so both accept/reject a token
//! identically.

use crate::StoreError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_DAYS: i64 = 7;

/// Decoded bearer token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user's ID
    pub sub: String,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
}

/// Issues and verifies bearer tokens against a single operator-provided
/// secret. The process refuses to start without one.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    /// Construct a token service. Returns [`StoreError::Validation`] if
    /// the secret is empty, matching the "fatal if missing" contract
    /// from the caller.
    pub fn new(secret: impl Into<String>) -> Result<Self, StoreError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(StoreError::Validation("AUTH_SECRET is required".to_string()));
        }
        Ok(Self { secret })
    }

    /// Mint a fresh bearer token for `user_id`, expiring in exactly 7 days.
    pub fn issue(&self, user_id: &str) -> Result<String, StoreError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| StoreError::Validation(format!("failed to sign token: {e}")))
    }

    /// Verify a bearer token, returning its claims if valid and unexpired.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_back_to_same_user() {
        let svc = TokenService::new("test-secret").unwrap();
        let token = svc.issue("user-1").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn rejects_token_signed_with_different_secret() {
        let svc_a = TokenService::new("secret-a").unwrap();
        let svc_b = TokenService::new("secret-b").unwrap();
        let token = svc_a.issue("user-1").unwrap();
        assert!(svc_b.verify(&token).is_none());
    }

    #[test]
    fn rejects_garbage_token() {
        let svc = TokenService::new("test-secret").unwrap();
        assert!(svc.verify("not-a-jwt").is_none());
    }

    #[test]
    fn refuses_empty_secret() {
        assert!(TokenService::new("").is_err());
    }
}
