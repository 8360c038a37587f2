//! Device registry: known device endpoints keyed by an opaque id.
//!
//! Entries are immutable once created; there is no update operation.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::GatewayError;
use crate::storage::collection::CollectionStore;
use crate::utils::generate_uuid;

pub use openapi_server::models::DeviceSummary;

/// Persisted form of a registered device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDevice {
    pub id: String,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(deserialize_with = "openapi_server::models::port::deserialize")]
    pub port: u16,
}

/// A device endpoint with its credentials
pub struct DeviceEndpoint {
    pub id: String,
    pub host: String,
    pub username: String,
    pub secret: SecretString,
    pub port: u16,
}

impl DeviceEndpoint {
    /// `host:port`
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Redacted view for listings
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id.clone(),
            host: self.host.clone(),
            user: self.username.clone(),
            port: self.port,
        }
    }
}

impl fmt::Debug for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEndpoint")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl From<&StoredDevice> for DeviceEndpoint {
    fn from(stored: &StoredDevice) -> Self {
        Self {
            id: stored.id.clone(),
            host: stored.host.clone(),
            username: stored.user.clone(),
            secret: SecretString::from(stored.pass.clone()),
            port: stored.port,
        }
    }
}

/// Registration input
pub struct NewDevice {
    pub host: String,
    pub username: String,
    pub secret: Option<SecretString>,
    pub port: Option<u16>,
}

/// Device registry backed by a collection store
pub struct DeviceRegistry {
    store: Arc<dyn CollectionStore<StoredDevice>>,
    default_port: u16,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn CollectionStore<StoredDevice>>, default_port: u16) -> Self {
        Self {
            store,
            default_port,
            write_lock: Mutex::new(()),
        }
    }

    /// Find a device by id
    pub async fn lookup(&self, id: &str) -> Result<DeviceEndpoint, GatewayError> {
        self.store
            .load()
            .await?
            .iter()
            .find(|d| d.id == id)
            .map(DeviceEndpoint::from)
            .ok_or_else(|| GatewayError::NotFound(format!("router {id}")))
    }

    /// All devices, secrets redacted
    pub async fn list(&self) -> Result<Vec<DeviceSummary>, GatewayError> {
        Ok(self
            .store
            .load()
            .await?
            .iter()
            .map(|d| DeviceEndpoint::from(d).summary())
            .collect())
    }

    /// Register a device and return its fresh id
    pub async fn add(&self, device: NewDevice) -> Result<String, GatewayError> {
        let host = device.host.trim();
        let username = device.username.trim();
        if host.is_empty() || username.is_empty() {
            return Err(GatewayError::ValidationError(
                "host & user required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut devices = self.store.load().await?;

        let id = generate_uuid();
        devices.push(StoredDevice {
            id: id.clone(),
            host: host.to_string(),
            user: username.to_string(),
            pass: device
                .secret
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_default(),
            port: device.port.unwrap_or(self.default_port),
        });
        self.store.save(&devices).await?;

        info!("Registered router {} at {}", id, host);
        Ok(id)
    }

    /// De-register a device. Removing an unknown id is not an error.
    pub async fn remove(&self, id: &str) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.store.load().await?;

        let before = devices.len();
        devices.retain(|d| d.id != id);
        if devices.len() != before {
            self.store.save(&devices).await?;
            info!("Removed router {}", id);
        }
        Ok(())
    }
}
