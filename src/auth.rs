// ABOUTME: Bearer token authentication with HMAC-SHA256 signed claims
// ABOUTME: Verifies tokens against a shared secret using constant-time comparison

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a verified token. `sub` is the acting user id that the
/// repository trusts for created_by/updated_by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthState {
    secret: Arc<Vec<u8>>,
}

impl AuthState {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::new(secret.as_bytes().to_vec()),
        }
    }

    /// Mints a token for the given subject: `base64url(claims).base64url(mac)`.
    /// The service itself only verifies; minting lives here so tooling and
    /// tests share one token format.
    #[allow(dead_code)]
    pub fn issue(&self, sub: &str, ttl_seconds: i64) -> Result<String> {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + ttl_seconds,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a bearer token against the shared secret and returns the
    /// decoded claims. Rejects bad signatures, malformed payloads, and
    /// expired tokens.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AppError::Unauthorized("malformed token".to_string()))?;

        let expected = self.sign(payload.as_bytes())?;
        if !constant_time_compare(signature, &expected) {
            return Err(AppError::Unauthorized(
                "invalid token signature".to_string(),
            ));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::Unauthorized("malformed token payload".to_string()))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|_| AppError::Unauthorized("malformed token claims".to_string()))?;

        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(AppError::Unauthorized("token expired".to_string()));
        }

        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| AppError::Internal(format!("hmac key setup failed: {err}")))?;
        mac.update(data);
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time comparison so signature checks do not leak how many
/// characters matched.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_round_trip() {
        let auth = AuthState::new("test-secret");
        let token = auth.issue("alice", 3600).unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let auth = AuthState::new("test-secret");
        let token = auth.issue("alice", 3600).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(auth.verify(&tampered).is_err());

        assert!(auth.verify("not-a-token").is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = AuthState::new("secret-a").issue("alice", 3600).unwrap();
        assert!(AuthState::new("secret-b").verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthState::new("test-secret");
        let token = auth.issue("alice", -10).unwrap();

        let err = auth.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("signature", "signature"));
        assert!(!constant_time_compare("signature", "Signature"));
        assert!(!constant_time_compare("signature", "signatur"));
    }
}
