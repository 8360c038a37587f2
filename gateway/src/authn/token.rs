//! Operator bearer tokens (HS256 JWT)

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::errors::GatewayError;

/// Operator token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorClaims {
    /// Subject (operator id)
    pub sub: String,

    /// Role at issue time
    pub role: Role,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// Issues and verifies operator tokens
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Sign a token for `subject`
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, GatewayError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = OperatorClaims {
            sub: subject.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| GatewayError::Internal(format!("failed to sign token: {e}")))
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<OperatorClaims, GatewayError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<OperatorClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| GatewayError::InvalidToken(e.to_string()))
    }
}
