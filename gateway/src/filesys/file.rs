//! Single-file access for the JSON stores and backup artifacts

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::GatewayError;

#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(fs::read(&self.path).await?)
    }

    /// Parse the whole file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        let bytes = self.read_bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace the file with pretty-printed JSON.
    ///
    /// The document is written to a sibling temp file and renamed into place,
    /// so a concurrent reader sees either the old or the new document.
    pub async fn write_json_atomic<T: Serialize>(&self, value: &T) -> Result<(), GatewayError> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.ensure_parent().await?;

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    /// Create the file and write `contents`; an existing file is an error and is left untouched
    pub async fn write_new(&self, contents: &[u8]) -> Result<(), GatewayError> {
        self.ensure_parent().await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Remove the file. Already gone counts as success.
    pub async fn delete(&self) -> Result<(), GatewayError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Owner read/write only. The stores hold password hashes and device secrets.
    pub async fn restrict_to_owner(&self) -> Result<(), GatewayError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }

    async fn ensure_parent(&self) -> Result<(), GatewayError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}
