//! Whole-collection JSON persistence.
//!
//! Each collection is read whole and overwritten whole on every mutation.
//! Callers serialize their read-modify-write cycles; see [`CollectionStore`].

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::errors::GatewayError;
use crate::filesys::file::File;

/// Durable whole-collection store
#[async_trait]
pub trait CollectionStore<T>: Send + Sync {
    /// Read the whole collection; a store that was never written is empty
    async fn load(&self) -> Result<Vec<T>, GatewayError>;

    /// Overwrite the whole collection
    async fn save(&self, items: &[T]) -> Result<(), GatewayError>;
}

/// JSON array in a single file
#[derive(Debug)]
pub struct JsonCollection<T> {
    file: File,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T> {
    pub fn new(file: File) -> Self {
        Self {
            file,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> CollectionStore<T> for JsonCollection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Vec<T>, GatewayError> {
        if !self.file.exists().await {
            return Ok(Vec::new());
        }
        self.file.read_json().await
    }

    async fn save(&self, items: &[T]) -> Result<(), GatewayError> {
        self.file.write_json_atomic(&items).await?;
        self.file.restrict_to_owner().await?;
        debug!("Wrote {} item(s) to {}", items.len(), self.file.path().display());
        Ok(())
    }
}
