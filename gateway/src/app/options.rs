//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::session::DEFAULT_CONNECT_TIMEOUT;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{Settings, DEV_JWT_SECRET};

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Server configuration
    pub server: ServerOptions,

    /// Core gateway configuration
    pub gateway: GatewayOptions,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl AppOptions {
    /// Options from resolved settings, storing data under `layout`
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            server: ServerOptions {
                host: settings.host.clone(),
                port: settings.port,
            },
            gateway: GatewayOptions {
                layout,
                write_enabled: settings.enable_write,
                connect_timeout: settings.connect_timeout(),
                command_timeout: settings.command_timeout(),
                jwt_secret: SecretString::from(settings.jwt_secret.clone()),
                token_ttl: settings.token_ttl(),
                default_device_port: settings.default_device_port,
            },
            ..Default::default()
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            server: ServerOptions::default(),
            gateway: GatewayOptions::default(),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Options for the gateway core
#[derive(Debug)]
pub struct GatewayOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Process-wide switch for mutating commands
    pub write_enabled: bool,

    /// Bound on device connect plus login
    pub connect_timeout: Duration,

    /// Budget for a single device command
    pub command_timeout: Duration,

    /// Operator token signing secret
    pub jwt_secret: SecretString,

    /// Operator token lifetime
    pub token_ttl: Duration,

    /// API port for devices registered without one
    pub default_device_port: u16,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            layout: StorageLayout::default(),
            write_enabled: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: Duration::from_secs(30),
            jwt_secret: SecretString::from(DEV_JWT_SECRET),
            token_ttl: Duration::from_secs(12 * 60 * 60),
            default_device_port: 8728,
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
