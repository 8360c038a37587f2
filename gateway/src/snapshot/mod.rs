//! Configuration snapshots.
//!
//! A snapshot is assembled from a fixed sequence of reads over one session
//! and persisted as a pair of artifacts. Either every read succeeds and both
//! artifacts are written, or nothing is written.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::GatewayError;
use crate::executor::{CommandExecutor, CommandResult, CommandSpec, Record};
use crate::registry::DeviceEndpoint;
use crate::session::DeviceSession;
use crate::utils::sha256_hex;

pub use store::BackupStore;

/// Reads performed for every snapshot, in order
pub fn snapshot_commands() -> [CommandSpec; 8] {
    [
        CommandSpec::new("/system/resource/print"),
        CommandSpec::new("/ip/address/print"),
        CommandSpec::new("/ip/firewall/filter/print"),
        CommandSpec::new("/ip/firewall/nat/print"),
        CommandSpec::new("/queue/simple/print"),
        CommandSpec::new("/interface/vlan/print"),
        CommandSpec::new("/interface/bridge/print"),
        CommandSpec::new("/export").param("terse", ""),
    ]
}

/// Which device a snapshot came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub host: String,
    pub user: String,
}

/// Point-in-time aggregate of one device's configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub created_at: DateTime<Utc>,
    pub device_identity: DeviceIdentity,
    pub resource_summary: Record,
    pub address_list: Vec<Record>,
    pub filter_rules: Vec<Record>,
    pub nat_rules: Vec<Record>,
    pub queue_list: Vec<Record>,
    pub vlan_list: Vec<Record>,
    pub bridge_list: Vec<Record>,
    pub raw_export_lines: Vec<String>,
    pub raw_export_sha256: String,
}

impl Snapshot {
    /// The raw export as written to the text artifact
    pub fn raw_export_text(&self) -> String {
        self.raw_export_lines.join("\n")
    }
}

/// Runs the snapshot reads over a single session
#[derive(Debug, Clone)]
pub struct SnapshotAssembler {
    executor: CommandExecutor,
}

impl SnapshotAssembler {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Run every read in order; the first failure aborts the whole snapshot
    pub async fn assemble(
        &self,
        session: &mut dyn DeviceSession,
        identity: DeviceIdentity,
        created_at: DateTime<Utc>,
    ) -> Result<Snapshot, GatewayError> {
        let [resource, addresses, filter, nat, queues, vlans, bridges, export] =
            snapshot_commands();

        let resource = self.read(session, &resource).await?;
        let addresses = self.read(session, &addresses).await?;
        let filter = self.read(session, &filter).await?;
        let nat = self.read(session, &nat).await?;
        let queues = self.read(session, &queues).await?;
        let vlans = self.read(session, &vlans).await?;
        let bridges = self.read(session, &bridges).await?;
        let export = self.read(session, &export).await?;

        let raw_export_lines = export_lines(&export);
        let raw_export_sha256 = sha256_hex(raw_export_lines.join("\n").as_bytes());

        info!(
            "Assembled snapshot of {} ({} export lines)",
            identity.host,
            raw_export_lines.len()
        );

        Ok(Snapshot {
            created_at,
            device_identity: identity,
            resource_summary: resource.first_or_default(),
            address_list: addresses.into_records(),
            filter_rules: filter.into_records(),
            nat_rules: nat.into_records(),
            queue_list: queues.into_records(),
            vlan_list: vlans.into_records(),
            bridge_list: bridges.into_records(),
            raw_export_lines,
            raw_export_sha256,
        })
    }

    async fn read(
        &self,
        session: &mut dyn DeviceSession,
        spec: &CommandSpec,
    ) -> Result<CommandResult, GatewayError> {
        debug!("Snapshot read {}", spec.path);
        self.executor.execute(session, spec).await
    }
}

impl DeviceIdentity {
    pub fn of(endpoint: &DeviceEndpoint) -> Self {
        Self {
            host: endpoint.host.clone(),
            user: endpoint.username.clone(),
        }
    }
}

/// Flatten export records into text lines.
///
/// Text delivered in `ret` is split into lines; any other record is kept as
/// one JSON line so nothing the device sent is dropped.
pub fn export_lines(result: &CommandResult) -> Vec<String> {
    let mut lines = Vec::new();
    for record in &result.records {
        match record.get("ret") {
            Some(text) if record.len() == 1 => {
                lines.extend(text.lines().map(str::to_string));
            }
            _ => lines.push(serde_json::to_string(record).unwrap_or_default()),
        }
    }
    lines
}
