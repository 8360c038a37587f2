//! Settings file management

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::GatewayError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Signing secret used when none is configured
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rotated log files under the logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HS256 signing secret for operator tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Operator token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Process-wide switch for mutating device commands
    #[serde(default = "default_true")]
    pub enable_write: bool,

    /// Bound on device connect plus login, in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Budget for a single device command, in milliseconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,

    /// API port used when a device is registered without one
    #[serde(default = "default_device_port")]
    pub default_device_port: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_ttl() -> u64 {
    12 * 60 * 60
}

fn default_connect_timeout() -> u64 {
    8_000
}

fn default_command_timeout() -> u64 {
    30_000
}

fn default_device_port() -> u16 {
    8728
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            host: default_host(),
            port: default_port(),
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
            enable_write: true,
            connect_timeout_ms: default_connect_timeout(),
            command_timeout_ms: default_command_timeout(),
            default_device_port: default_device_port(),
        }
    }
}

impl Settings {
    /// Read settings from `file`; a missing file yields defaults
    pub async fn load(file: &File) -> Result<Self, GatewayError> {
        if !file.exists().await {
            return Ok(Self::default());
        }
        file.read_json().await.map_err(|e| {
            GatewayError::ConfigError(format!(
                "unable to read {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        const KEYS: [(&str, &str); 5] = [
            ("ROUTERGATE_HOST", "host"),
            ("ROUTERGATE_PORT", "port"),
            ("ROUTERGATE_JWT_SECRET", "jwt-secret"),
            ("ROUTERGATE_ENABLE_WRITE", "enable-write"),
            ("ROUTERGATE_LOG_LEVEL", "log-level"),
        ];
        for (var, key) in KEYS {
            if let Some(value) = lookup(var) {
                self.set(key, &value)?;
            }
        }
        Ok(())
    }

    /// Apply `--key=value` command line overrides; unknown keys are ignored
    pub fn apply_args(&mut self, args: &HashMap<String, String>) -> Result<(), GatewayError> {
        for (key, value) in args {
            if Self::is_known_key(key) {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    fn is_known_key(key: &str) -> bool {
        matches!(
            key,
            "host"
                | "port"
                | "jwt-secret"
                | "token-ttl-secs"
                | "enable-write"
                | "connect-timeout-ms"
                | "command-timeout-ms"
                | "default-device-port"
                | "log-level"
                | "log-json"
                | "log-to-file"
        )
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GatewayError> {
        let invalid = |e: &dyn std::fmt::Display| {
            GatewayError::ConfigError(format!("invalid value {value:?} for {key}: {e}"))
        };
        match key {
            "host" => self.host = value.to_string(),
            "port" => self.port = value.parse().map_err(|e| invalid(&e))?,
            "jwt-secret" => self.jwt_secret = value.to_string(),
            "token-ttl-secs" => self.token_ttl_secs = value.parse().map_err(|e| invalid(&e))?,
            "enable-write" => self.enable_write = value.eq_ignore_ascii_case("true"),
            "connect-timeout-ms" => {
                self.connect_timeout_ms = value.parse().map_err(|e| invalid(&e))?
            }
            "command-timeout-ms" => {
                self.command_timeout_ms = value.parse().map_err(|e| invalid(&e))?
            }
            "default-device-port" => {
                self.default_device_port = value.parse().map_err(|e| invalid(&e))?
            }
            "log-level" => self.log_level = value.parse().map_err(|e: String| invalid(&e))?,
            "log-json" => self.log_json = value.eq_ignore_ascii_case("true"),
            "log-to-file" => self.log_to_file = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Log a warning for settings that are unsafe outside development
    pub fn warn_insecure(&self) {
        if self.jwt_secret == DEV_JWT_SECRET {
            warn!("JWT secret is the development default; set ROUTERGATE_JWT_SECRET in production");
        }
        if !self.enable_write {
            warn!("Writes are disabled: every mutating device command will be rejected");
        }
    }
}
