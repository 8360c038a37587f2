//! Gateway API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod port;

/// One device reply record: protocol field name to value
pub type Record = BTreeMap<String, String>;

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body returned by every failing endpoint.
///
/// `kind` is stable and meant for programmatic branching; `category` groups
/// kinds into `auth`, `policy`, `device`, `client` and `internal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub category: String,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ---- auth ----

/// Register / login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Operator profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// Token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub ok: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

/// Role reassignment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateRequest {
    #[serde(default)]
    pub role: String,
}

/// Role reassignment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateResponse {
    pub ok: bool,
    pub id: String,
    pub role: String,
}

// ---- device registry ----

/// Registered device, secret redacted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    pub host: String,
    pub user: String,
    pub port: u16,
}

/// Device registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDeviceRequest {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default, deserialize_with = "port::deserialize_opt")]
    pub port: Option<u16>,
}

/// Device registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDeviceResponse {
    pub ok: bool,
    pub id: String,
}

// ---- device commands ----

/// Generic runner request. Parameters are `=key=value` or `key=value` words.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

/// Result of a mutating device command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub ok: bool,
    pub out: Vec<Record>,
}

/// Monitoring response: raw resource record plus extracted figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub resource: Record,
    pub cpu_load: Option<u8>,
    pub free_memory: Option<u64>,
    pub total_memory: Option<u64>,
    pub uptime: Option<String>,
    pub version: Option<String>,
    pub board_name: Option<String>,
}

/// Raw configuration export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub ok: bool,
    pub lines: Vec<String>,
}

/// Add IP address request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub interface: String,
}

/// Add firewall filter rule request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRuleRequest {
    #[serde(default = "default_filter_chain")]
    pub chain: String,
    #[serde(default = "default_filter_action")]
    pub action: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dst: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub comment: String,
}

fn default_filter_chain() -> String {
    "input".to_string()
}

fn default_filter_action() -> String {
    "accept".to_string()
}

/// Add NAT rule request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatRuleRequest {
    #[serde(default = "default_nat_chain")]
    pub chain: String,
    #[serde(default = "default_nat_action")]
    pub action: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dst: String,
    #[serde(default)]
    pub out_interface: String,
    #[serde(default)]
    pub comment: String,
}

fn default_nat_chain() -> String {
    "srcnat".to_string()
}

fn default_nat_action() -> String {
    "masquerade".to_string()
}

/// Add VLAN request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlanRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vlan_id: Option<serde_json::Value>,
    #[serde(default)]
    pub interface: String,
}

/// Add simple queue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target: String,
    /// e.g. `10M/10M`
    #[serde(default)]
    pub max_limit: String,
}

/// Add device-local user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user_group")]
    pub group: String,
}

fn default_user_group() -> String {
    "full".to_string()
}

/// Add hotspot user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub profile: String,
}

/// Traffic monitor query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorQuery {
    pub iface: Option<String>,
}

// ---- backups ----

/// Locations of the two artifacts written for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFiles {
    pub snapshot: String,
    pub export: String,
}

/// Snapshot creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResponse {
    pub ok: bool,
    pub files: BackupFiles,
}

/// Backup catalogue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub name: String,
    /// `snapshot` or `export`
    pub kind: String,
    pub url: String,
}
