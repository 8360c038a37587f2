//! Backup artifact storage

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::errors::GatewayError;
use crate::filesys::dir::Dir;
use crate::snapshot::Snapshot;

pub use openapi_server::models::{BackupEntry, BackupFiles};

/// Extension of the structured artifact
pub const SNAPSHOT_EXT: &str = ".json";

/// Extension of the raw export artifact
pub const EXPORT_EXT: &str = ".rsc.txt";

/// URL prefix under which artifacts are served
pub const URL_PREFIX: &str = "/backups";

/// Filesystem-safe artifact base name: `{host}_{timestamp}`
pub fn artifact_base(host: &str, created_at: &DateTime<Utc>) -> String {
    let host = host.replace([':', '/', '\\'], "_");
    let when = created_at
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{host}_{when}")
}

/// Timestamp part of an artifact name, used for newest-first ordering
fn timestamp_of(name: &str) -> &str {
    let stem = name
        .strip_suffix(SNAPSHOT_EXT)
        .or_else(|| name.strip_suffix(EXPORT_EXT))
        .unwrap_or(name);
    stem.rsplit('_').next().unwrap_or(stem)
}

fn kind_of(name: &str) -> &'static str {
    if name.ends_with(SNAPSHOT_EXT) {
        "snapshot"
    } else {
        "export"
    }
}

fn is_artifact(name: &str) -> bool {
    name.ends_with(SNAPSHOT_EXT) || name.ends_with(EXPORT_EXT)
}

/// Append-only store of snapshot artifacts
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: Dir,
}

impl BackupStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    /// Write both artifacts for `snapshot`.
    ///
    /// Existing files are never overwritten. If the second artifact cannot be
    /// written the first is removed so no half pair is left behind.
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<BackupFiles, GatewayError> {
        let base = artifact_base(&snapshot.device_identity.host, &snapshot.created_at);
        let json_name = format!("{base}{SNAPSHOT_EXT}");
        let export_name = format!("{base}{EXPORT_EXT}");

        let json = serde_json::to_vec_pretty(snapshot)?;
        let json_file = self.dir.file(&json_name);
        json_file.write_new(&json).await?;

        let export_file = self.dir.file(&export_name);
        if let Err(e) = export_file
            .write_new(snapshot.raw_export_text().as_bytes())
            .await
        {
            error!("Failed to write {}: {}", export_name, e);
            if let Err(cleanup) = json_file.delete().await {
                error!("Failed to remove {}: {}", json_name, cleanup);
            }
            return Err(e);
        }

        info!("Saved backup {}", base);
        Ok(BackupFiles {
            snapshot: format!("{URL_PREFIX}/{json_name}"),
            export: format!("{URL_PREFIX}/{export_name}"),
        })
    }

    /// Stored artifacts, newest first
    pub async fn list(&self) -> Result<Vec<BackupEntry>, GatewayError> {
        let mut names: Vec<String> = self
            .dir
            .file_names()
            .await?
            .into_iter()
            .filter(|n| is_artifact(n))
            .collect();
        names.sort_by(|a, b| {
            (timestamp_of(b), b.as_str()).cmp(&(timestamp_of(a), a.as_str()))
        });

        Ok(names
            .into_iter()
            .map(|name| BackupEntry {
                kind: kind_of(&name).to_string(),
                url: format!("{URL_PREFIX}/{name}"),
                name,
            })
            .collect())
    }

    /// Contents of one artifact by name
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, GatewayError> {
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name.contains("..")
            || !is_artifact(name)
        {
            return Err(GatewayError::ValidationError(format!(
                "invalid backup name {name:?}"
            )));
        }

        let file = self.dir.file(name);
        if !file.exists().await {
            return Err(GatewayError::NotFound(format!("backup {name}")));
        }
        file.read_bytes().await
    }
}
