//! Typed device operations and the commands they translate to

use std::fmt;

use serde_json::Value;

use crate::errors::GatewayError;
use crate::executor::CommandSpec;

pub use openapi_server::models::{
    AddressRequest, DeviceUserRequest, FilterRuleRequest, HotspotUserRequest, NatRuleRequest,
    QueueRequest, VlanRequest,
};

/// Device tables readable through a typed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Interfaces,
    Addresses,
    FilterRules,
    NatRules,
    Bridges,
    Vlans,
    Queues,
    DhcpLeases,
    DeviceUsers,
    HotspotUsers,
    CapsmanRegistrations,
}

impl Table {
    pub fn print_path(&self) -> &'static str {
        match self {
            Table::Interfaces => "/interface/print",
            Table::Addresses => "/ip/address/print",
            Table::FilterRules => "/ip/firewall/filter/print",
            Table::NatRules => "/ip/firewall/nat/print",
            Table::Bridges => "/interface/bridge/print",
            Table::Vlans => "/interface/vlan/print",
            Table::Queues => "/queue/simple/print",
            Table::DhcpLeases => "/ip/dhcp-server/lease/print",
            Table::DeviceUsers => "/user/print",
            Table::HotspotUsers => "/ip/hotspot/user/print",
            Table::CapsmanRegistrations => "/caps-man/registration-table/print",
        }
    }

    /// Removal command, for tables whose entries can be removed by `.id`
    pub fn remove_path(&self) -> Option<&'static str> {
        match self {
            Table::Addresses => Some("/ip/address/remove"),
            Table::FilterRules => Some("/ip/firewall/filter/remove"),
            Table::NatRules => Some("/ip/firewall/nat/remove"),
            Table::Vlans => Some("/interface/vlan/remove"),
            Table::Queues => Some("/queue/simple/remove"),
            Table::DeviceUsers => Some("/user/remove"),
            Table::HotspotUsers => Some("/ip/hotspot/user/remove"),
            Table::Interfaces
            | Table::Bridges
            | Table::DhcpLeases
            | Table::CapsmanRegistrations => None,
        }
    }

    pub fn print(&self) -> CommandSpec {
        CommandSpec::new(self.print_path())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Interfaces => "interfaces",
            Table::Addresses => "addresses",
            Table::FilterRules => "filter rules",
            Table::NatRules => "nat rules",
            Table::Bridges => "bridges",
            Table::Vlans => "vlans",
            Table::Queues => "queues",
            Table::DhcpLeases => "dhcp leases",
            Table::DeviceUsers => "device users",
            Table::HotspotUsers => "hotspot users",
            Table::CapsmanRegistrations => "capsman registrations",
        };
        f.write_str(name)
    }
}

/// One traffic sample of an interface
pub fn monitor_traffic(iface: &str) -> Result<CommandSpec, GatewayError> {
    let iface = iface.trim();
    if iface.is_empty() {
        return Err(GatewayError::ValidationError("iface required".to_string()));
    }
    Ok(CommandSpec::new("/interface/monitor-traffic")
        .param("interface", iface)
        .param("once", ""))
}

/// Terse configuration export
pub fn export() -> CommandSpec {
    CommandSpec::new("/export").param("terse", "")
}

/// System resource record
pub fn resource() -> CommandSpec {
    CommandSpec::new("/system/resource/print")
}

/// A mutating typed operation
#[derive(Debug, Clone)]
pub enum DeviceChange {
    AddAddress(AddressRequest),
    AddFilterRule(FilterRuleRequest),
    AddNatRule(NatRuleRequest),
    AddVlan(VlanRequest),
    AddQueue(QueueRequest),
    AddDeviceUser(DeviceUserRequest),
    AddHotspotUser(HotspotUserRequest),
    Remove { table: Table, item_id: String },
    Reboot,
}

impl DeviceChange {
    /// Translate to a device command, checking required fields
    pub fn to_command(&self) -> Result<CommandSpec, GatewayError> {
        match self {
            DeviceChange::AddAddress(req) => {
                require(&[&req.address, &req.interface], "address & interface required")?;
                Ok(CommandSpec::new("/ip/address/add")
                    .param("address", &req.address)
                    .param("interface", &req.interface))
            }
            DeviceChange::AddFilterRule(req) => {
                require(&[&req.chain, &req.action], "chain & action required")?;
                Ok(CommandSpec::new("/ip/firewall/filter/add")
                    .param("chain", &req.chain)
                    .param("action", &req.action)
                    .param_opt("src-address", &req.src)
                    .param_opt("dst-address", &req.dst)
                    .param_opt("protocol", &req.protocol)
                    .param_opt("comment", &req.comment))
            }
            DeviceChange::AddNatRule(req) => {
                require(&[&req.chain, &req.action], "chain & action required")?;
                Ok(CommandSpec::new("/ip/firewall/nat/add")
                    .param("chain", &req.chain)
                    .param("action", &req.action)
                    .param_opt("src-address", &req.src)
                    .param_opt("dst-address", &req.dst)
                    .param_opt("out-interface", &req.out_interface)
                    .param_opt("comment", &req.comment))
            }
            DeviceChange::AddVlan(req) => {
                const MSG: &str = "name, vlan_id, interface required";
                let vlan_id = req
                    .vlan_id
                    .as_ref()
                    .and_then(scalar_text)
                    .ok_or_else(|| GatewayError::ValidationError(MSG.to_string()))?;
                require(&[&req.name, &vlan_id, &req.interface], MSG)?;
                Ok(CommandSpec::new("/interface/vlan/add")
                    .param("name", &req.name)
                    .param("vlan-id", vlan_id)
                    .param("interface", &req.interface))
            }
            DeviceChange::AddQueue(req) => {
                require(
                    &[&req.name, &req.target, &req.max_limit],
                    "name, target, max_limit required",
                )?;
                Ok(CommandSpec::new("/queue/simple/add")
                    .param("name", &req.name)
                    .param("target", &req.target)
                    .param("max-limit", &req.max_limit))
            }
            DeviceChange::AddDeviceUser(req) => {
                require(&[&req.name, &req.password], "name & password required")?;
                Ok(CommandSpec::new("/user/add")
                    .param("name", &req.name)
                    .param("password", &req.password)
                    .param("group", &req.group))
            }
            DeviceChange::AddHotspotUser(req) => {
                require(&[&req.name, &req.password], "name & password required")?;
                Ok(CommandSpec::new("/ip/hotspot/user/add")
                    .param("name", &req.name)
                    .param("password", &req.password)
                    .param_opt("profile", &req.profile))
            }
            DeviceChange::Remove { table, item_id } => {
                let Some(path) = table.remove_path() else {
                    return Err(GatewayError::ValidationError(format!(
                        "{table} cannot be removed"
                    )));
                };
                require(&[item_id], "item id required")?;
                Ok(CommandSpec::new(path).param(".id", item_id))
            }
            DeviceChange::Reboot => Ok(CommandSpec::new("/system/reboot")),
        }
    }
}

fn require(fields: &[&String], message: &str) -> Result<(), GatewayError> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        Err(GatewayError::ValidationError(message.to_string()))
    } else {
        Ok(())
    }
}

/// Text of a JSON string or number; anything else counts as missing
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
