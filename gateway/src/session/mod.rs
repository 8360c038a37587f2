//! Device sessions.
//!
//! A session is opened for exactly one unit of work and closed on every exit
//! path before control returns to the caller. Sessions are never pooled or
//! shared between requests.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::errors::GatewayError;
use crate::executor::{Param, Record};
use crate::registry::DeviceEndpoint;

/// Default bound on connect plus login
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// One authenticated connection to a device
#[async_trait]
pub trait DeviceSession: Send {
    /// Send one command and collect every record until the device signals completion
    async fn send(&mut self, path: &str, params: &[Param]) -> Result<Vec<Record>, GatewayError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), GatewayError>;
}

/// Opens sessions against a device endpoint
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self, endpoint: &DeviceEndpoint)
        -> Result<Box<dyn DeviceSession>, GatewayError>;
}

/// Opens bounded, single-use sessions
#[derive(Clone)]
pub struct SessionFactory {
    connector: Arc<dyn DeviceConnector>,
    connect_timeout: Duration,
}

impl SessionFactory {
    pub fn new(connector: Arc<dyn DeviceConnector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connect and authenticate, bounded by the connect timeout. Never retries.
    pub async fn open(
        &self,
        endpoint: &DeviceEndpoint,
    ) -> Result<Box<dyn DeviceSession>, GatewayError> {
        let target = endpoint.address();
        debug!("Opening session to {}", target);

        match tokio::time::timeout(self.connect_timeout, self.connector.connect(endpoint)).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(GatewayError::ConnectFailure { target, cause })) => {
                warn!("Connect to {} failed: {}", target, cause);
                Err(GatewayError::ConnectFailure { target, cause })
            }
            Ok(Err(e)) => {
                warn!("Connect to {} failed: {}", target, e);
                Err(GatewayError::ConnectFailure {
                    target,
                    cause: e.to_string(),
                })
            }
            Err(_) => {
                warn!("Connect to {} timed out after {:?}", target, self.connect_timeout);
                Err(GatewayError::ConnectFailure {
                    target,
                    cause: format!("timed out after {:?}", self.connect_timeout),
                })
            }
        }
    }

    /// Open a session, run `work` on it, and close it on every exit path.
    ///
    /// The session is closed even if `work` fails or panics; a panic is
    /// resumed after the close. A failed close is logged and does not mask
    /// the outcome of `work`.
    pub async fn with_session<T, F>(&self, endpoint: &DeviceEndpoint, work: F) -> Result<T, GatewayError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut dyn DeviceSession) -> BoxFuture<'s, Result<T, GatewayError>>
            + Send,
    {
        let mut session = self.open(endpoint).await?;
        let session_id = uuid::Uuid::new_v4();
        info!("Session {} opened to {}", session_id, endpoint.address());

        let outcome = AssertUnwindSafe(work(session.as_mut())).catch_unwind().await;

        match session.close().await {
            Ok(()) => info!("Session {} closed", session_id),
            Err(e) => warn!("Session {} close failed: {}", session_id, e),
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
