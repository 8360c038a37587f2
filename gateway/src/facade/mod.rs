//! Gateway facade.
//!
//! Every operation walks the same states: resolve the caller, check the
//! caller's role, resolve the device, check the command against policy, then
//! run it over a freshly opened session that is closed before returning.
//! A failure at any step ends the request with exactly one error.

pub mod monitor;
pub mod operations;

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, info};

use crate::access::{authorize, Action, Role};
use crate::authn::users::{UserDirectory, UserProfile};
use crate::authn::{CredentialService, Grant, Principal};
use crate::errors::GatewayError;
use crate::executor::{CommandExecutor, CommandResult, CommandSpec, Record};
use crate::policy::{parse_params, CommandClass, CommandPolicy};
use crate::registry::{DeviceRegistry, DeviceSummary, NewDevice};
use crate::session::SessionFactory;
use crate::snapshot::store::{BackupEntry, BackupFiles};
use crate::snapshot::{
    export_lines, snapshot_commands, BackupStore, DeviceIdentity, SnapshotAssembler,
};

use self::monitor::{summarize, MonitorResponse};
use self::operations::{DeviceChange, Table};

/// Collaborators the gateway is assembled from
pub struct GatewayParts {
    pub credentials: Arc<dyn CredentialService>,
    pub users: Arc<UserDirectory>,
    pub registry: Arc<DeviceRegistry>,
    pub policy: CommandPolicy,
    pub sessions: SessionFactory,
    pub executor: CommandExecutor,
    pub backups: BackupStore,
}

/// Single entry point for operator requests
pub struct Gateway {
    credentials: Arc<dyn CredentialService>,
    users: Arc<UserDirectory>,
    registry: Arc<DeviceRegistry>,
    policy: CommandPolicy,
    sessions: SessionFactory,
    executor: CommandExecutor,
    assembler: SnapshotAssembler,
    backups: BackupStore,
}

impl Gateway {
    pub fn new(parts: GatewayParts) -> Self {
        Self {
            assembler: SnapshotAssembler::new(parts.executor.clone()),
            credentials: parts.credentials,
            users: parts.users,
            registry: parts.registry,
            policy: parts.policy,
            sessions: parts.sessions,
            executor: parts.executor,
            backups: parts.backups,
        }
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    // ---- operators ----

    /// Resolve the caller behind a bearer token
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, GatewayError> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingToken)?;
        self.credentials.verify_token(token).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Grant, GatewayError> {
        self.credentials.register(username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Grant, GatewayError> {
        self.credentials.login(username, password).await
    }

    pub async fn list_users(&self, caller: &Principal) -> Result<Vec<UserProfile>, GatewayError> {
        authorize(caller.role, Action::ListUsers)?;
        self.users.list().await
    }

    pub async fn assign_role(
        &self,
        caller: &Principal,
        user_id: &str,
        role: &str,
    ) -> Result<UserProfile, GatewayError> {
        authorize(caller.role, Action::AssignRole)?;
        let role: Role = role.parse()?;
        self.users.set_role(user_id, role).await
    }

    // ---- device registry ----

    pub async fn list_devices(&self, caller: &Principal) -> Result<Vec<DeviceSummary>, GatewayError> {
        authorize(caller.role, Action::ListDevices)?;
        self.registry.list().await
    }

    pub async fn add_device(&self, caller: &Principal, device: NewDevice) -> Result<String, GatewayError> {
        authorize(caller.role, Action::ManageDevices)?;
        self.registry.add(device).await
    }

    pub async fn remove_device(&self, caller: &Principal, device_id: &str) -> Result<(), GatewayError> {
        authorize(caller.role, Action::ManageDevices)?;
        self.registry.remove(device_id).await
    }

    // ---- device reads ----

    /// First record of `/system/resource/print`
    pub async fn resource(&self, caller: &Principal, device_id: &str) -> Result<Record, GatewayError> {
        Ok(self
            .read(caller, device_id, operations::resource())
            .await?
            .first_or_default())
    }

    /// Resource record plus the extracted monitoring figures
    pub async fn monitor(
        &self,
        caller: &Principal,
        device_id: &str,
    ) -> Result<MonitorResponse, GatewayError> {
        let resource = self.resource(caller, device_id).await?;
        Ok(summarize(resource))
    }

    /// One traffic sample of `iface`
    pub async fn monitor_traffic(
        &self,
        caller: &Principal,
        device_id: &str,
        iface: &str,
    ) -> Result<Record, GatewayError> {
        authorize(caller.role, Action::ReadDevice)?;
        let spec = operations::monitor_traffic(iface)?;
        Ok(self.dispatch(device_id, spec).await?.first_or_default())
    }

    pub async fn list(
        &self,
        caller: &Principal,
        device_id: &str,
        table: Table,
    ) -> Result<Vec<Record>, GatewayError> {
        Ok(self.read(caller, device_id, table.print()).await?.into_records())
    }

    /// Raw configuration export as text lines
    pub async fn export(&self, caller: &Principal, device_id: &str) -> Result<Vec<String>, GatewayError> {
        let result = self.read(caller, device_id, operations::export()).await?;
        Ok(export_lines(&result))
    }

    async fn read(
        &self,
        caller: &Principal,
        device_id: &str,
        spec: CommandSpec,
    ) -> Result<CommandResult, GatewayError> {
        authorize(caller.role, Action::ReadDevice)?;
        self.dispatch(device_id, spec).await
    }

    // ---- device writes ----

    /// Apply a typed change. Required fields are checked before any session opens.
    pub async fn apply(
        &self,
        caller: &Principal,
        device_id: &str,
        change: DeviceChange,
    ) -> Result<Vec<Record>, GatewayError> {
        authorize(caller.role, Action::WriteDevice)?;
        let spec = change.to_command()?;
        info!("Operator {} applying {} on {}", caller.subject, spec, device_id);
        Ok(self.dispatch(device_id, spec).await?.into_records())
    }

    /// Generic runner for any allow-listed path
    pub async fn run(
        &self,
        caller: &Principal,
        device_id: &str,
        path: &str,
        words: &[String],
    ) -> Result<Vec<Record>, GatewayError> {
        authorize(caller.role, Action::RunCommand)?;
        let params = parse_params(words)?;
        let spec = CommandSpec {
            path: path.to_string(),
            params,
        };
        if self.policy.class_of(&spec.path) == Some(CommandClass::Write) {
            authorize(caller.role, Action::WriteDevice)?;
        }
        info!("Operator {} running {} on {}", caller.subject, spec, device_id);
        Ok(self.dispatch(device_id, spec).await?.into_records())
    }

    /// Resolve the device, check policy, and run `spec` over its own session
    async fn dispatch(&self, device_id: &str, spec: CommandSpec) -> Result<CommandResult, GatewayError> {
        let endpoint = self.registry.lookup(device_id).await?;
        let class = self.policy.check(&spec)?;
        debug!("{} is a {:?} command", spec.path, class);

        let executor = self.executor.clone();
        self.sessions
            .with_session(&endpoint, move |session| {
                async move { executor.execute(session, &spec).await }.boxed()
            })
            .await
    }

    // ---- backups ----

    /// Assemble a snapshot over one session and persist both artifacts
    pub async fn take_backup(
        &self,
        caller: &Principal,
        device_id: &str,
    ) -> Result<BackupFiles, GatewayError> {
        authorize(caller.role, Action::TakeBackup)?;
        let endpoint = self.registry.lookup(device_id).await?;
        for spec in snapshot_commands() {
            self.policy.check(&spec)?;
        }

        let identity = DeviceIdentity::of(&endpoint);
        let created_at = Utc::now();
        let assembler = self.assembler.clone();
        let snapshot = self
            .sessions
            .with_session(&endpoint, move |session| {
                async move { assembler.assemble(session, identity, created_at).await }.boxed()
            })
            .await?;

        self.backups.persist(&snapshot).await
    }

    pub async fn list_backups(&self, caller: &Principal) -> Result<Vec<BackupEntry>, GatewayError> {
        authorize(caller.role, Action::ReadBackups)?;
        self.backups.list().await
    }

    pub async fn read_backup(&self, caller: &Principal, name: &str) -> Result<Vec<u8>, GatewayError> {
        authorize(caller.role, Action::ReadBackups)?;
        self.backups.read(name).await
    }
}
