//! Shared fixtures: an in-process mock device and gateway builders

use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tempfile::TempDir;

use routergate::access::Role;
use routergate::app::options::GatewayOptions;
use routergate::app::run::build_gateway;
use routergate::authn::Principal;
use routergate::errors::GatewayError;
use routergate::executor::{Param, Record};
use routergate::facade::Gateway;
use routergate::registry::{DeviceEndpoint, NewDevice};
use routergate::session::{DeviceConnector, DeviceSession};
use routergate::storage::layout::StorageLayout;

/// How the mock device fails, if at all
#[derive(Debug, Clone)]
pub enum Failure {
    /// `!trap` with this message
    Device(String),
    /// Connection dropped mid-command
    Transport,
    /// Never answers
    Hang,
}

/// How the mock device answers a connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Accept,
    Refuse,
    Hang,
}

/// Scriptable device shared by every session it hands out
pub struct MockDevice {
    connect: ConnectBehavior,
    /// (1-based command number within a session, failure)
    fail_on: Option<(usize, Failure)>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub sent: Mutex<Vec<(String, Vec<Param>)>>,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Self::build(ConnectBehavior::Accept, None)
    }

    pub fn failing_on(command: usize, failure: Failure) -> Arc<Self> {
        Self::build(ConnectBehavior::Accept, Some((command, failure)))
    }

    pub fn with_connect(connect: ConnectBehavior) -> Arc<Self> {
        Self::build(connect, None)
    }

    fn build(connect: ConnectBehavior, fail_on: Option<(usize, Failure)>) -> Arc<Self> {
        Arc::new(Self {
            connect,
            fail_on,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sent_paths(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn connector(self: &Arc<Self>) -> Arc<MockConnector> {
        Arc::new(MockConnector {
            device: self.clone(),
        })
    }
}

/// Canned replies, loosely shaped like a real device
fn reply_for(path: &str, params: &[Param]) -> Vec<Record> {
    let record = |pairs: &[(&str, &str)]| -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };

    match path {
        "/system/resource/print" => vec![record(&[
            ("cpu-load", "3"),
            ("free-memory", "100000"),
            ("total-memory", "268435456"),
            ("uptime", "2d4h"),
            ("version", "7.14.2 (stable)"),
            ("board-name", "RB5009"),
        ])],
        "/export" => vec![record(&[(
            "ret",
            "/interface bridge\nadd name=bridge1\n/ip address\nadd address=192.168.88.1/24 interface=bridge1",
        )])],
        "/system/reboot" => Vec::new(),
        p if p.ends_with("/add") => vec![record(&[("ret", "*A")])],
        p if p.ends_with("/remove") || p.ends_with("/set") => Vec::new(),
        "/interface/monitor-traffic" => {
            let iface = params
                .iter()
                .find(|p| p.key == "interface")
                .map(|p| p.value.as_str())
                .unwrap_or_default();
            vec![record(&[("name", iface), ("rx-bits-per-second", "1200")])]
        }
        _ => vec![
            record(&[(".id", "*1"), ("name", "first")]),
            record(&[(".id", "*2"), ("name", "second")]),
        ],
    }
}

pub struct MockConnector {
    device: Arc<MockDevice>,
}

#[async_trait]
impl DeviceConnector for MockConnector {
    async fn connect(
        &self,
        endpoint: &DeviceEndpoint,
    ) -> Result<Box<dyn DeviceSession>, GatewayError> {
        match self.device.connect {
            ConnectBehavior::Accept => {
                self.device.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MockSession {
                    device: self.device.clone(),
                    commands: 0,
                }))
            }
            ConnectBehavior::Refuse => Err(GatewayError::ConnectFailure {
                target: endpoint.address(),
                cause: "connection refused".to_string(),
            }),
            ConnectBehavior::Hang => pending().await,
        }
    }
}

pub struct MockSession {
    device: Arc<MockDevice>,
    commands: usize,
}

#[async_trait]
impl DeviceSession for MockSession {
    async fn send(&mut self, path: &str, params: &[Param]) -> Result<Vec<Record>, GatewayError> {
        self.commands += 1;
        self.device
            .sent
            .lock()
            .unwrap()
            .push((path.to_string(), params.to_vec()));

        match &self.device.fail_on {
            Some((n, failure)) if *n == self.commands => match failure {
                Failure::Device(message) => Err(GatewayError::DeviceError(message.clone())),
                Failure::Transport => Err(GatewayError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))),
                Failure::Hang => pending().await,
            },
            _ => Ok(reply_for(path, params)),
        }
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        self.device.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn principal(role: Role) -> Principal {
    Principal {
        subject: format!("{role}-operator"),
        role,
    }
}

pub fn endpoint() -> DeviceEndpoint {
    DeviceEndpoint {
        id: "dev-1".to_string(),
        host: "192.168.88.1".to_string(),
        username: "admin".to_string(),
        secret: SecretString::from("router-pass"),
        port: 8728,
    }
}

pub fn gateway_options(dir: &TempDir, write_enabled: bool) -> GatewayOptions {
    GatewayOptions {
        layout: StorageLayout::new(dir.path()),
        write_enabled,
        connect_timeout: Duration::from_millis(200),
        command_timeout: Duration::from_millis(200),
        jwt_secret: SecretString::from("test-secret"),
        ..Default::default()
    }
}

/// A gateway over a fresh temp dir with one registered device
pub async fn gateway_with_device(
    device: &Arc<MockDevice>,
    write_enabled: bool,
) -> (TempDir, Gateway, String) {
    let dir = tempfile::tempdir().unwrap();
    let gateway = build_gateway(gateway_options(&dir, write_enabled), device.connector());
    let id = gateway
        .add_device(
            &principal(Role::Owner),
            NewDevice {
                host: "192.168.88.1".to_string(),
                username: "admin".to_string(),
                secret: Some(SecretString::from("router-pass")),
                port: None,
            },
        )
        .await
        .unwrap();
    (dir, gateway, id)
}
