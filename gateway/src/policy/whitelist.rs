//! Compiled-in command allow-list

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::policy::CommandClass;

/// Every command path the gateway will forward to a device.
pub const ALLOW_LIST: &[&str] = &[
    // print
    "/system/resource/print",
    "/interface/print",
    "/ip/address/print",
    "/ip/firewall/filter/print",
    "/ip/firewall/nat/print",
    "/ip/dhcp-server/lease/print",
    "/user/print",
    "/queue/simple/print",
    "/interface/bridge/print",
    "/interface/vlan/print",
    "/caps-man/registration-table/print",
    "/ip/hotspot/user/print",
    "/interface/monitor-traffic",
    "/export",
    // changes
    "/ip/address/add",
    "/ip/address/remove",
    "/ip/firewall/filter/add",
    "/ip/firewall/filter/remove",
    "/ip/firewall/nat/add",
    "/ip/firewall/nat/remove",
    "/queue/simple/add",
    "/queue/simple/remove",
    "/user/add",
    "/user/remove",
    "/interface/set",
    "/interface/vlan/add",
    "/interface/vlan/remove",
    "/ip/hotspot/user/add",
    "/ip/hotspot/user/remove",
    "/system/reboot",
];

/// Mutating endpoints whose last segment does not say so
pub const EXPLICIT_WRITES: &[&str] = &["/system/reboot"];

const WRITE_VERBS: &[&str] = &["add", "remove", "set"];

/// Structural classification of a command path
pub fn classify(path: &str) -> CommandClass {
    let verb = path.rsplit('/').next().unwrap_or_default();
    if WRITE_VERBS.contains(&verb) || EXPLICIT_WRITES.contains(&path) {
        CommandClass::Write
    } else {
        CommandClass::Read
    }
}

static TABLE: LazyLock<HashMap<&'static str, CommandClass>> =
    LazyLock::new(|| ALLOW_LIST.iter().map(|p| (*p, classify(p))).collect());

/// Look up a path verbatim
pub fn lookup(path: &str) -> Option<CommandClass> {
    TABLE.get(path).copied()
}
