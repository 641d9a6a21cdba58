//! Ident protocol client.
//!
//! One query = one TCP connection to `remote_ip:port` (113 by default), one request
//! line, one reply line. All execution modes share a single async exchange:
//!
//! - [`IdentClient::query_async`] awaits the exchange and surfaces failures as [`IdentError`]
//! - [`IdentClient::fetch`] awaits the exchange and folds failures into a failed [`IdentResponse`]
//! - [`IdentClient::query_with`] spawns [`IdentClient::fetch`] and hands the response to a callback
//! - [`IdentClient::query`] blocks the calling thread on [`IdentClient::query_async`]
//!
//! No retries are attempted; each call carries its own timeout, measured from
//! invocation and covering connect, write and read.

pub mod transport;

use crate::config::IdentConfig;
use crate::error::ident::IdentError;
use crate::protocol::{self, MAX_REPLY_LEN, Reply};

use transport::{Connector, IdentStream, TcpConnector};

use models::{IdentResponse, IdentResponseBuilder, PortPair};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::{Builder as RuntimeBuilder, Handle};
use tokio::time::timeout as TokioTimeout;

/// The TCP connection being identified, from this host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub local: SocketAddr,
    pub remote: SocketAddr,
}

impl Endpoints {
    pub fn new(local: SocketAddr, remote: SocketAddr) -> Self {
        Self { local, remote }
    }

    /// Ports as the remote ident server sees them: its own port first.
    pub fn port_pair(&self) -> PortPair {
        PortPair::new(self.remote.port(), self.local.port())
    }
}

#[derive(Clone)]
pub struct IdentClient {
    config: IdentConfig,
    connector: Arc<dyn Connector>,
    runtime: Option<Handle>,
}

impl IdentClient {
    pub fn new(config: IdentConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    pub fn with_connector(config: IdentConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            runtime: None,
        }
    }

    /// Runtime that [`query_with`](Self::query_with) spawns onto when called
    /// outside of one.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn config(&self) -> &IdentConfig {
        &self.config
    }

    /// Per-call override, or the configured default.
    pub fn effective_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.config.timeout())
    }

    /// Identify the owner of `endpoints`, surfacing every failure as an error.
    ///
    /// A server `ERROR` reply is returned as [`IdentError::Protocol`] carrying the token.
    pub async fn query_async(
        &self,
        endpoints: Endpoints,
        timeout: Option<Duration>,
    ) -> Result<IdentResponse, IdentError> {
        let timeout = self.effective_timeout(timeout);

        debug!(
            "Ident query for {} -> {} (timeout {timeout:?})",
            endpoints.local, endpoints.remote
        );

        let result = match TokioTimeout(timeout, self.exchange(endpoints, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(IdentError::timeout(timeout)),
        };

        match &result {
            Ok(response) => debug!("Ident reply from {}: {response}", endpoints.remote),
            Err(e) => warn!("Ident query to {} failed: {e}", endpoints.remote),
        }

        result
    }

    /// Identify the owner of `endpoints`; failures come back as a failed response.
    pub async fn fetch(&self, endpoints: Endpoints, timeout: Option<Duration>) -> IdentResponse {
        match self.query_async(endpoints, timeout).await {
            Ok(response) => response,
            Err(e) => failed_response(&endpoints, &e),
        }
    }

    /// Start a query and return immediately; `callback` receives the response,
    /// successful or not, once the exchange finishes.
    ///
    /// Runs on the runtime given to [`with_runtime`](Self::with_runtime), else on the
    /// current one. Without either, the callback is invoked right away with a
    /// transport failure.
    pub fn query_with<F>(&self, endpoints: Endpoints, timeout: Option<Duration>, callback: F)
    where
        F: FnOnce(IdentResponse) + Send + 'static,
    {
        let handle = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => handle,
            None => {
                let error = IdentError::transport("No async runtime available for ident query");
                warn!("{error}");
                callback(failed_response(&endpoints, &error));
                return;
            }
        };

        let client = self.clone();
        handle.spawn(async move {
            let response = client.fetch(endpoints, timeout).await;
            callback(response);
        });
    }

    /// Blocking form of [`query_async`](Self::query_async).
    ///
    /// Drives the exchange on a private current-thread runtime. Calling this from
    /// inside an async context is refused with a transport error; use
    /// `query_async` there instead.
    pub fn query(
        &self,
        endpoints: Endpoints,
        timeout: Option<Duration>,
    ) -> Result<IdentResponse, IdentError> {
        if Handle::try_current().is_ok() {
            return Err(IdentError::transport(
                "Blocking ident query called from within an async runtime",
            ));
        }

        let runtime = RuntimeBuilder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| IdentError::transport(format!("Failed to start ident runtime: {e}")))?;

        runtime.block_on(self.query_async(endpoints, timeout))
    }

    async fn exchange(
        &self,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<IdentResponse, IdentError> {
        let port_pair = endpoints.port_pair();
        protocol::validate_port_pair(port_pair)?;

        let target = SocketAddr::new(endpoints.remote.ip(), self.config.port);

        let mut stream = self
            .connector
            .connect(target, timeout)
            .await
            .map_err(|e| {
                IdentError::from_io(&format!("Cannot connect to {target}"), &e, timeout)
            })?;

        let query = protocol::format_query(port_pair);
        trace!("ident -> {target}: {}", query.trim_end());

        stream.write_all(query.as_bytes()).await?;
        stream.flush().await?;

        let line = read_reply_line(&mut stream).await?;
        trace!("ident <- {target}: {line}");

        // One request per connection; the peer may already be gone.
        let _ = stream.shutdown().await;

        match protocol::parse_reply(&line, port_pair)? {
            Reply::UserId {
                os,
                charset,
                username,
            } => {
                let mut builder = IdentResponseBuilder::default()
                    .with_port_pair(port_pair)
                    .with_remote_address(endpoints.remote.ip())
                    .with_user(username)
                    .with_os(os);

                if let Some(charset) = charset {
                    builder = builder.with_charset(charset);
                }

                Ok(builder.build()?)
            }
            Reply::Error { token } => Err(IdentError::server_reported(token)),
        }
    }
}

impl std::fmt::Debug for IdentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentClient")
            .field("config", &self.config)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Read a single `\n`-terminated line, at most [`MAX_REPLY_LEN`] bytes plus CRLF.
async fn read_reply_line(stream: &mut IdentStream) -> Result<String, IdentError> {
    let limit = (MAX_REPLY_LEN + 2) as u64;
    let mut reader = BufReader::new(stream.take(limit));
    let mut buffer = Vec::new();

    reader.read_until(b'\n', &mut buffer).await?;

    if buffer.last() != Some(&b'\n') {
        if buffer.len() as u64 >= limit {
            return Err(IdentError::protocol(format!(
                "Reply exceeds {MAX_REPLY_LEN} bytes"
            )));
        }
        return Err(IdentError::transport(
            "Connection closed before a complete reply line",
        ));
    }

    String::from_utf8(buffer).map_err(|_| IdentError::protocol("Reply is not valid UTF-8"))
}

fn failed_response(endpoints: &Endpoints, error: &IdentError) -> IdentResponse {
    IdentResponse::failure(
        endpoints.port_pair(),
        endpoints.remote.ip(),
        error.to_response_error(),
    )
}
