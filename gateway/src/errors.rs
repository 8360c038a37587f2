//! Error types for the gateway

use http::StatusCode;
use thiserror::Error;

use crate::access::{Action, Role};

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad credentials")]
    BadCredentials,

    #[error("missing token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("registration closed")]
    RegistrationClosed,

    #[error("insufficient role: {role} may not {action}")]
    InsufficientRole { role: Role, action: Action },

    #[error("command not allowed: {0}")]
    NotWhitelisted(String),

    #[error("writes disabled")]
    WritesDisabled,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("connect to {target} failed: {cause}")]
    ConnectFailure { target: String, cause: String },

    /// Device-reported failure; the message is the device's own text.
    #[error("{0}")]
    DeviceError(String),

    #[error("transport failure: {0}")]
    TransportError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bcrypt::BcryptError> for GatewayError {
    fn from(err: bcrypt::BcryptError) -> Self {
        GatewayError::Internal(format!("password hashing failed: {err}"))
    }
}

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadCredentials,
    MissingToken,
    InvalidToken,
    RegistrationClosed,
    InsufficientRole,
    NotWhitelisted,
    WritesDisabled,
    InvalidParameters,
    ConnectFailure,
    DeviceError,
    TransportError,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadCredentials => "bad_credentials",
            ErrorKind::MissingToken => "missing_token",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::RegistrationClosed => "registration_closed",
            ErrorKind::InsufficientRole => "insufficient_role",
            ErrorKind::NotWhitelisted => "not_whitelisted",
            ErrorKind::WritesDisabled => "writes_disabled",
            ErrorKind::InvalidParameters => "invalid_parameters",
            ErrorKind::ConnectFailure => "connect_failure",
            ErrorKind::DeviceError => "device_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }

    /// Coarse grouping so clients can tell policy, device and auth failures apart
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::BadCredentials
            | ErrorKind::MissingToken
            | ErrorKind::InvalidToken
            | ErrorKind::RegistrationClosed
            | ErrorKind::InsufficientRole => "auth",
            ErrorKind::NotWhitelisted
            | ErrorKind::WritesDisabled
            | ErrorKind::InvalidParameters => "policy",
            ErrorKind::ConnectFailure | ErrorKind::DeviceError | ErrorKind::TransportError => {
                "device"
            }
            ErrorKind::NotFound | ErrorKind::Validation => "client",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadCredentials | ErrorKind::MissingToken | ErrorKind::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::RegistrationClosed
            | ErrorKind::InsufficientRole
            | ErrorKind::WritesDisabled => StatusCode::FORBIDDEN,
            ErrorKind::NotWhitelisted | ErrorKind::InvalidParameters | ErrorKind::Validation => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::ConnectFailure | ErrorKind::DeviceError | ErrorKind::TransportError => {
                StatusCode::BAD_GATEWAY
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::BadCredentials => ErrorKind::BadCredentials,
            GatewayError::MissingToken => ErrorKind::MissingToken,
            GatewayError::InvalidToken(_) => ErrorKind::InvalidToken,
            GatewayError::RegistrationClosed => ErrorKind::RegistrationClosed,
            GatewayError::InsufficientRole { .. } => ErrorKind::InsufficientRole,
            GatewayError::NotWhitelisted(_) => ErrorKind::NotWhitelisted,
            GatewayError::WritesDisabled => ErrorKind::WritesDisabled,
            GatewayError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            GatewayError::ConnectFailure { .. } => ErrorKind::ConnectFailure,
            GatewayError::DeviceError(_) => ErrorKind::DeviceError,
            GatewayError::TransportError(_) => ErrorKind::TransportError,
            GatewayError::ValidationError(_) => ErrorKind::Validation,
            GatewayError::IoError(_)
            | GatewayError::JsonError(_)
            | GatewayError::ConfigError(_)
            | GatewayError::ServerError(_)
            | GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for rejections raised before any device traffic
    pub fn is_policy_rejection(&self) -> bool {
        self.kind().category() == "policy"
    }
}
