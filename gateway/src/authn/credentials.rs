//! Credential service: bearer tokens and username/password login

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::access::Role;
use crate::authn::token::TokenSigner;
use crate::authn::users::{UserDirectory, UserProfile};
use crate::errors::GatewayError;

/// bcrypt work factor for new hashes
pub const HASH_COST: u32 = 10;

/// A verified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
}

/// Successful login or registration
#[derive(Debug, Clone)]
pub struct Grant {
    pub token: String,
    pub profile: UserProfile,
}

/// Resolves callers from credentials. Raw passwords never cross this boundary.
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Verify a bearer token and resolve the caller's current role
    async fn verify_token(&self, token: &str) -> Result<Principal, GatewayError>;

    /// Exchange username and password for a token
    async fn login(&self, username: &str, password: &str) -> Result<Grant, GatewayError>;

    /// Create the first (owner) account; closed once any account exists
    async fn register(&self, username: &str, password: &str) -> Result<Grant, GatewayError>;
}

/// Credential service backed by the local user directory
pub struct LocalCredentials {
    users: Arc<UserDirectory>,
    signer: TokenSigner,
}

impl LocalCredentials {
    pub fn new(users: Arc<UserDirectory>, signer: TokenSigner) -> Self {
        Self { users, signer }
    }
}

#[async_trait]
impl CredentialService for LocalCredentials {
    async fn verify_token(&self, token: &str) -> Result<Principal, GatewayError> {
        let claims = self.signer.verify(token)?;

        // The stored role wins over the one in the token so demotions apply at once.
        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| GatewayError::InvalidToken("unknown subject".to_string()))?;

        Ok(Principal {
            subject: user.id,
            role: user.role,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<Grant, GatewayError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            debug!("Login for unknown user {:?}", username);
            return Err(GatewayError::BadCredentials);
        };

        if !verify_password(password, &user.password).await? {
            debug!("Wrong password for {:?}", username);
            return Err(GatewayError::BadCredentials);
        }

        let token = self.signer.issue(&user.id, user.role)?;
        info!("Operator {} logged in", user.username);
        Ok(Grant {
            token,
            profile: user.profile(),
        })
    }

    async fn register(&self, username: &str, password: &str) -> Result<Grant, GatewayError> {
        if username.is_empty() || password.is_empty() {
            return Err(GatewayError::ValidationError(
                "username & password required".to_string(),
            ));
        }

        let hash = hash_password(password).await?;
        let user = self.users.create_first_owner(username, hash).await?;
        let token = self.signer.issue(&user.id, user.role)?;
        Ok(Grant {
            token,
            profile: user.profile(),
        })
    }
}

async fn hash_password(password: &str) -> Result<String, GatewayError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST))
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?
        .map_err(GatewayError::from)
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, GatewayError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    // A malformed stored hash is treated as a mismatch.
    Ok(result.unwrap_or(false))
}
