//! Command policy: the allow-list and write gate that stand between client
//! input and a device.
//!
//! The allow-list is compiled in and has no mutation API. The write switch is
//! a process-wide kill-switch passed in at construction and applies to every
//! role alike.

pub mod whitelist;

use serde::Serialize;
use tracing::warn;

use crate::errors::GatewayError;
use crate::executor::{CommandSpec, Param};

/// Maximum number of parameters accepted for one command
pub const MAX_PARAMS: usize = 32;

/// Capability class of a command path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandClass {
    Read,
    Write,
}

/// Allow-list plus write gate
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    write_enabled: bool,
    max_params: usize,
}

impl CommandPolicy {
    pub fn new(write_enabled: bool) -> Self {
        Self {
            write_enabled,
            max_params: MAX_PARAMS,
        }
    }

    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Class of a whitelisted path, `None` when the path is not allowed
    pub fn class_of(&self, path: &str) -> Option<CommandClass> {
        whitelist::lookup(path)
    }

    /// Decide whether `path` may execute at all under the current write switch
    pub fn authorize(&self, path: &str) -> Result<CommandClass, GatewayError> {
        let Some(class) = whitelist::lookup(path) else {
            warn!("Rejected non-whitelisted command {:?}", path);
            return Err(GatewayError::NotWhitelisted(path.to_string()));
        };

        if class == CommandClass::Write && !self.write_enabled {
            warn!("Rejected {} while writes are disabled", path);
            return Err(GatewayError::WritesDisabled);
        }

        Ok(class)
    }

    /// Full check of a command: path, write switch, then parameters
    pub fn check(&self, spec: &CommandSpec) -> Result<CommandClass, GatewayError> {
        let class = self.authorize(&spec.path)?;
        self.check_params(&spec.params)?;
        Ok(class)
    }

    fn check_params(&self, params: &[Param]) -> Result<(), GatewayError> {
        if params.len() > self.max_params {
            return Err(GatewayError::InvalidParameters(format!(
                "at most {} parameters allowed, got {}",
                self.max_params,
                params.len()
            )));
        }
        for param in params {
            validate_key(&param.key)?;
            validate_value(&param.key, &param.value)?;
        }
        Ok(())
    }
}

/// Parse raw client words (`=key=value` or `key=value`) into parameters.
///
/// Query words (`?`), reply/control words (`!`, `.tag`) and bare words are
/// rejected so the runner can only ever pass plain attributes.
pub fn parse_params(words: &[String]) -> Result<Vec<Param>, GatewayError> {
    if words.len() > MAX_PARAMS {
        return Err(GatewayError::InvalidParameters(format!(
            "at most {} parameters allowed, got {}",
            MAX_PARAMS,
            words.len()
        )));
    }
    words.iter().map(|w| parse_param(w)).collect()
}

fn parse_param(word: &str) -> Result<Param, GatewayError> {
    let body = word.strip_prefix('=').unwrap_or(word);
    let Some((key, value)) = body.split_once('=') else {
        return Err(GatewayError::InvalidParameters(format!(
            "expected key=value, got {word:?}"
        )));
    };
    validate_key(key)?;
    validate_value(key, value)?;
    Ok(Param::new(key, value))
}

fn validate_key(key: &str) -> Result<(), GatewayError> {
    let valid = !key.is_empty()
        && key != ".tag"
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidParameters(format!(
            "invalid parameter name {key:?}"
        )))
    }
}

fn validate_value(key: &str, value: &str) -> Result<(), GatewayError> {
    if value.contains(['\0', '\r', '\n']) {
        return Err(GatewayError::InvalidParameters(format!(
            "control characters in value of {key:?}"
        )));
    }
    Ok(())
}
