//! RouterOS API session over TCP

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::errors::GatewayError;
use crate::executor::{Param, Record};
use crate::registry::DeviceEndpoint;
use crate::routeros::codec::{read_sentence, write_sentence, Reply};
use crate::session::{DeviceConnector, DeviceSession};

/// Connects to the RouterOS API service (plain TCP, default port 8728)
#[derive(Debug, Clone, Default)]
pub struct RouterOsConnector;

impl RouterOsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceConnector for RouterOsConnector {
    async fn connect(
        &self,
        endpoint: &DeviceEndpoint,
    ) -> Result<Box<dyn DeviceSession>, GatewayError> {
        let target = endpoint.address();
        let connect_failure = |cause: String| GatewayError::ConnectFailure {
            target: target.clone(),
            cause,
        };

        let stream = TcpStream::connect(&target)
            .await
            .map_err(|e| connect_failure(e.to_string()))?;
        stream.set_nodelay(true).ok();

        let mut session = RouterOsSession::new(stream);
        match session.login(endpoint).await {
            Ok(()) => {
                debug!("Logged in to {} as {}", target, endpoint.username);
                Ok(Box::new(session))
            }
            Err(e) => {
                // The socket is dropped with `session`; no session outlives a failed login.
                let cause = match e {
                    GatewayError::DeviceError(msg) => format!("authentication rejected: {msg}"),
                    other => other.to_string(),
                };
                Err(connect_failure(cause))
            }
        }
    }
}

/// An authenticated API connection
pub struct RouterOsSession {
    stream: BufStream<TcpStream>,
    closed: bool,
}

impl RouterOsSession {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufStream::new(stream),
            closed: false,
        }
    }

    async fn login(&mut self, endpoint: &DeviceEndpoint) -> Result<(), GatewayError> {
        let words = [
            "/login".to_string(),
            format!("=name={}", endpoint.username),
            format!("=password={}", endpoint.secret.expose_secret()),
        ];
        let records = self.exchange(&words).await?;

        // Pre-6.43 firmware answers with an MD5 challenge instead of logging in.
        if records.iter().any(|r| r.contains_key("ret")) {
            return Err(GatewayError::TransportError(
                "device requires legacy challenge login".to_string(),
            ));
        }
        Ok(())
    }

    /// Write one sentence and read replies until `!done`
    async fn exchange(&mut self, words: &[String]) -> Result<Vec<Record>, GatewayError> {
        write_sentence(&mut self.stream, words)
            .await
            .map_err(|e| GatewayError::TransportError(e.to_string()))?;

        let mut records = Vec::new();
        let mut trap: Option<String> = None;

        loop {
            let sentence = read_sentence(&mut self.stream)
                .await
                .map_err(|e| GatewayError::TransportError(e.to_string()))?;
            let reply =
                Reply::parse(&sentence).map_err(|e| GatewayError::TransportError(e.to_string()))?;

            match reply {
                Reply::Record(record) => records.push(record),
                Reply::Empty => {}
                Reply::Trap(record) => {
                    // A trap is followed by `!done`; keep reading to leave the stream in sync.
                    let message = record
                        .get("message")
                        .cloned()
                        .unwrap_or_else(|| "device reported an error".to_string());
                    trap.get_or_insert(message);
                }
                Reply::Done(record) => {
                    if let Some(message) = trap {
                        return Err(GatewayError::DeviceError(message));
                    }
                    if !record.is_empty() {
                        records.push(record);
                    }
                    return Ok(records);
                }
                Reply::Fatal(message) => {
                    self.closed = true;
                    return Err(GatewayError::TransportError(format!(
                        "device closed the session: {message}"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl DeviceSession for RouterOsSession {
    async fn send(&mut self, path: &str, params: &[Param]) -> Result<Vec<Record>, GatewayError> {
        if self.closed {
            return Err(GatewayError::TransportError("session is closed".to_string()));
        }
        let mut words = Vec::with_capacity(params.len() + 1);
        words.push(path.to_string());
        words.extend(params.iter().map(Param::to_word));
        self.exchange(&words).await
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // `/quit` is answered with `!fatal`; the reply is not awaited.
        if let Err(e) = write_sentence(&mut self.stream, &["/quit"]).await {
            debug!("Sending /quit failed: {}", e);
        }
        if let Err(e) = self.stream.shutdown().await {
            warn!("Socket shutdown failed: {}", e);
        }
        Ok(())
    }
}
