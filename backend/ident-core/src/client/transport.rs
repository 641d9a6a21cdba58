//! How the client reaches a remote ident port.
//!
//! [`IdentClient`](crate::client::IdentClient) only needs a byte stream. Production code
//! uses [`TcpConnector`]; tests plug in their own [`Connector`] to script replies or to
//! observe the timeout a connection attempt was given.

use std::io::{Error as IoError, ErrorKind};
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::trace;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout as TokioTimeout;

/// Byte stream an ident exchange runs over.
pub trait IdentIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IdentIo for T {}

pub type IdentStream = Box<dyn IdentIo>;

/// Opens the stream for one ident query.
///
/// `timeout` is the effective per-call bound; implementations should not wait
/// longer than it to establish the connection. A timed-out attempt is reported as
/// an error of kind [`ErrorKind::TimedOut`].
pub trait Connector: Send + Sync {
    fn connect(&self, target: SocketAddr, timeout: Duration)
    -> BoxFuture<'_, Result<IdentStream, IoError>>;
}

/// Plain TCP connector.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(
        &self,
        target: SocketAddr,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<IdentStream, IoError>> {
        async move {
            trace!("Connecting to ident service at {target} (timeout {timeout:?})");

            let stream = TokioTimeout(timeout, TcpStream::connect(target))
                .await
                .map_err(|_| {
                    IoError::new(
                        ErrorKind::TimedOut,
                        format!("connect to {target} timed out after {timeout:?}"),
                    )
                })??;

            stream.set_nodelay(true)?;

            Ok(Box::new(stream) as IdentStream)
        }
        .boxed()
    }
}
