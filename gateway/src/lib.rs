//! RouterGate library
//!
//! A multi-operator command gateway in front of RouterOS devices: role-gated,
//! allow-listed device commands over single-use sessions, plus configuration
//! snapshots persisted to disk.

pub mod access;
pub mod app;
pub mod authn;
pub mod errors;
pub mod executor;
pub mod facade;
pub mod filesys;
pub mod logs;
pub mod policy;
pub mod registry;
pub mod routeros;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod utils;
