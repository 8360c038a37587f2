//! Command executor: one command over one open session

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::GatewayError;
use crate::session::DeviceSession;

pub use openapi_server::models::Record;

/// A single `key=value` command parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Protocol attribute word
    pub fn to_word(&self) -> String {
        format!("={}={}", self.key, self.value)
    }
}

/// Command path plus ordered parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub path: String,
    pub params: Vec<Param>,
}

impl CommandSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Param::new(key, value));
        self
    }

    /// Add the parameter only when `value` is non-empty
    pub fn param_opt(self, key: impl Into<String>, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.param(key, value)
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for p in &self.params {
            write!(f, " ={}=…", p.key)?;
        }
        Ok(())
    }
}

/// Ordered records returned by one command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandResult {
    pub records: Vec<Record>,
}

impl CommandResult {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record, or an empty one when the device returned none
    pub fn first_or_default(&self) -> Record {
        self.records.first().cloned().unwrap_or_default()
    }

    /// Values of `field` across records, skipping records without it
    pub fn column(&self, field: &str) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.get(field).cloned())
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Sends commands with a per-command time budget
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `spec` and wait for protocol-signalled completion.
    ///
    /// Device-reported errors are returned verbatim as `DeviceError`; any
    /// transport problem, including the budget running out, becomes
    /// `TransportError` and no partial result is returned.
    pub async fn execute(
        &self,
        session: &mut dyn DeviceSession,
        spec: &CommandSpec,
    ) -> Result<CommandResult, GatewayError> {
        debug!("Executing {}", spec);

        let outcome = tokio::time::timeout(self.timeout, session.send(&spec.path, &spec.params)).await;

        match outcome {
            Ok(Ok(records)) => {
                debug!("{} returned {} record(s)", spec.path, records.len());
                Ok(CommandResult::new(records))
            }
            Ok(Err(e @ (GatewayError::DeviceError(_) | GatewayError::TransportError(_)))) => {
                warn!("{} failed: {}", spec.path, e);
                Err(e)
            }
            Ok(Err(GatewayError::IoError(e))) => {
                warn!("{} failed: {}", spec.path, e);
                Err(GatewayError::TransportError(e.to_string()))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!("{} timed out after {:?}", spec.path, self.timeout);
                Err(GatewayError::TransportError(format!(
                    "{} timed out after {:?}",
                    spec.path, self.timeout
                )))
            }
        }
    }
}
