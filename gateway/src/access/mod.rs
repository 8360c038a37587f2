//! Role-based access control.
//!
//! Every gated action carries an explicit set of permitted roles rather than
//! a privilege threshold, so `admin` and `owner` can diverge where needed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::GatewayError;

/// Operator role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Read,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::Admin, Role::Read];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Read => "read",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "read" => Ok(Role::Read),
            _ => Err(GatewayError::ValidationError(format!("invalid role: {s}"))),
        }
    }
}

/// Actions an operator can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read-only device command (print, monitor, export)
    ReadDevice,
    /// Mutating device command through a typed operation
    WriteDevice,
    /// Generic whitelisted runner, regardless of command class
    RunCommand,
    /// Take a configuration snapshot
    TakeBackup,
    /// List or fetch stored backup artifacts
    ReadBackups,
    /// List registered devices (redacted)
    ListDevices,
    /// Register or de-register a device
    ManageDevices,
    /// List operator accounts
    ListUsers,
    /// Change another operator's role
    AssignRole,
}

impl Action {
    /// Roles permitted to perform this action
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Action::ReadDevice | Action::ListDevices | Action::ReadBackups => {
                &[Role::Owner, Role::Admin, Role::Read]
            }
            Action::WriteDevice
            | Action::RunCommand
            | Action::TakeBackup
            | Action::ManageDevices => &[Role::Owner, Role::Admin],
            Action::ListUsers | Action::AssignRole => &[Role::Owner],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ReadDevice => "read device",
            Action::WriteDevice => "write device",
            Action::RunCommand => "run commands",
            Action::TakeBackup => "take backups",
            Action::ReadBackups => "read backups",
            Action::ListDevices => "list devices",
            Action::ManageDevices => "manage devices",
            Action::ListUsers => "list users",
            Action::AssignRole => "assign roles",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grant or deny `action` for `role`. Denial is terminal for the request.
pub fn authorize(role: Role, action: Action) -> Result<(), GatewayError> {
    if action.allowed_roles().contains(&role) {
        Ok(())
    } else {
        debug!("Denied {} for role {}", action, role);
        Err(GatewayError::InsufficientRole { role, action })
    }
}
