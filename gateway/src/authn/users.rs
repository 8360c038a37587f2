//! Operator accounts and their roles

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::access::Role;
use crate::errors::GatewayError;
use crate::storage::collection::CollectionStore;
use crate::utils::generate_uuid;

pub use openapi_server::models::UserProfile;

/// Persisted operator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// bcrypt hash
    pub password: String,
    pub role: Role,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role.to_string(),
        }
    }
}

/// Operator directory over a collection store
pub struct UserDirectory {
    store: Arc<dyn CollectionStore<UserRecord>>,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn CollectionStore<UserRecord>>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, GatewayError> {
        Ok(self
            .store
            .load()
            .await?
            .into_iter()
            .find(|u| u.username == username))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, GatewayError> {
        Ok(self.store.load().await?.into_iter().find(|u| u.id == id))
    }

    /// Create the first account as `owner`. Fails once any account exists.
    pub async fn create_first_owner(
        &self,
        username: &str,
        password_hash: String,
    ) -> Result<UserRecord, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.store.load().await?;
        if !users.is_empty() {
            return Err(GatewayError::RegistrationClosed);
        }

        let user = UserRecord {
            id: generate_uuid(),
            username: username.to_string(),
            password: password_hash,
            role: Role::Owner,
        };
        users.push(user.clone());
        self.store.save(&users).await?;

        info!("Registered owner account {}", user.username);
        Ok(user)
    }

    /// All accounts without password hashes
    pub async fn list(&self) -> Result<Vec<UserProfile>, GatewayError> {
        Ok(self
            .store
            .load()
            .await?
            .iter()
            .map(UserRecord::profile)
            .collect())
    }

    /// Reassign the role of account `id`
    pub async fn set_role(&self, id: &str, role: Role) -> Result<UserProfile, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.store.load().await?;

        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("user {id}")))?;
        user.role = role;
        let profile = user.profile();

        self.store.save(&users).await?;
        info!("Role of {} set to {}", profile.username, role);
        Ok(profile)
    }
}
