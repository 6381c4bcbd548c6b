//! Direct TCP handler
//!
//! Dials the requested destination and copies bytes with a deadline that is
//! pushed forward on every iteration, so a connection only dies after a full
//! timeout without progress.

use super::{Backend, ProxyHandler};
use crate::error::{ProxyError, ReplyReason, TransportError};
use crate::socks::{Request, TargetAddr, DEFAULT_BUFFER_SIZE};
use crate::transport::{DeadlineStream, SocketOpts};
use anyhow::Context;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handler that connects straight to the requested destination
#[derive(Debug, Clone)]
pub struct DefaultHandler {
    connect_timeout: Duration,
    timeout: Duration,
    buffer_size: usize,
    socket_opts: SocketOpts,
}

impl DefaultHandler {
    /// Create a handler whose dial and copy deadlines are both `timeout`
    pub fn new(timeout: Duration) -> Self {
        DefaultHandler {
            connect_timeout: timeout,
            timeout,
            buffer_size: DEFAULT_BUFFER_SIZE,
            socket_opts: SocketOpts::default(),
        }
    }

    /// Override the dial deadline
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Override the copy buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Override the options applied to dialed sockets
    pub fn with_socket_opts(mut self, socket_opts: SocketOpts) -> Self {
        self.socket_opts = socket_opts;
        self
    }

    /// Deadline for resolving and connecting
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Deadline for each copy iteration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Copy buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    async fn dial(&self, target: &TargetAddr) -> Result<TcpStream, ProxyError> {
        let connect = async {
            let addr = target
                .resolve()
                .await
                .map_err(|e| ProxyError::new(ReplyReason::HostUnreachable, e))?;

            debug!("Connecting to target: {}", addr);

            TcpStream::connect(addr).await.map_err(|e| {
                let reason = ReplyReason::for_dial_error(&e);
                ProxyError::new(
                    reason,
                    anyhow::Error::new(e).context(format!("Failed to connect to {}", addr)),
                )
            })
        };

        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProxyError::msg(
                    ReplyReason::HostUnreachable,
                    format!(
                        "Connection to {} timed out after {:?}",
                        target, self.connect_timeout
                    ),
                ))
            }
        };

        if let Err(e) = self.socket_opts.apply(&stream) {
            warn!("Failed to apply socket options: {}", e);
        }

        Ok(stream)
    }

    async fn copy(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        writer: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: &CancellationToken,
    ) -> Result<u64, TransportError> {
        let mut reader = DeadlineStream::new(reader);
        let mut writer = DeadlineStream::new(writer);
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        loop {
            reader.extend(self.timeout);
            let n = tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                n = reader.read(&mut buf) => n?,
            };

            writer.extend(self.timeout);
            if n == 0 {
                match writer.shutdown().await {
                    Err(e) if e.kind() != io::ErrorKind::NotConnected => return Err(e.into()),
                    _ => return Ok(total),
                }
            }

            writer.write_all(&buf[..n]).await?;
            total += n as u64;
        }
    }
}

#[async_trait]
impl ProxyHandler for DefaultHandler {
    async fn init(&self, request: &Request) -> Result<Backend, ProxyError> {
        let stream = self.dial(&request.destination).await?;
        Ok(Backend::tcp(stream))
    }

    async fn read_from_client(
        &self,
        client: &mut (dyn AsyncRead + Unpin + Send),
        remote: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let bytes = self
            .copy(client, remote, cancel)
            .await
            .context("client -> remote copy failed")?;
        debug!("client -> remote finished: {} bytes", bytes);
        Ok(())
    }

    async fn read_from_remote(
        &self,
        remote: &mut (dyn AsyncRead + Unpin + Send),
        client: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let bytes = self
            .copy(remote, client, cancel)
            .await
            .context("remote -> client copy failed")?;
        debug!("remote -> client finished: {} bytes", bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socks::{SocksCommand, Version};
    use std::net::SocketAddr;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    fn connect_request(destination: TargetAddr) -> Request {
        Request {
            version: Version::Socks5,
            command: SocksCommand::Connect,
            destination,
        }
    }

    async fn closed_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn test_default_handler_builders() {
        let handler = DefaultHandler::new(Duration::from_secs(10))
            .with_connect_timeout(Duration::from_secs(3))
            .with_buffer_size(0);

        assert_eq!(handler.timeout(), Duration::from_secs(10));
        assert_eq!(handler.connect_timeout(), Duration::from_secs(3));
        assert_eq!(handler.buffer_size(), 1);
        assert_eq!(
            DefaultHandler::new(Duration::from_secs(1)).buffer_size(),
            DEFAULT_BUFFER_SIZE
        );
    }

    #[tokio::test]
    async fn test_init_connects_and_reports_bound_addr() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = DefaultHandler::new(Duration::from_secs(5));
        let request = connect_request(TargetAddr::from(addr));

        let (backend, accepted) = tokio::join!(
            handler.init(&request),
            listener.accept()
        );
        let backend = backend.unwrap();
        let (_, peer) = accepted.unwrap();

        assert_eq!(backend.bound_addr, Some(TargetAddr::from(peer)));
    }

    #[tokio::test]
    async fn test_init_connection_refused() {
        let addr = closed_port().await;
        let handler = DefaultHandler::new(Duration::from_secs(5));

        let err = handler
            .init(&connect_request(TargetAddr::from(addr)))
            .await
            .unwrap_err();

        assert_eq!(err.reason(), ReplyReason::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_init_unresolvable_domain() {
        let handler = DefaultHandler::new(Duration::from_secs(5));

        let err = handler
            .init(&connect_request(TargetAddr::domain("does-not-exist.invalid", 80)))
            .await
            .unwrap_err();

        assert_eq!(err.reason(), ReplyReason::HostUnreachable);
    }

    #[tokio::test]
    async fn test_copy_forwards_and_shuts_down_writer() {
        let (mut client_app, mut client_side) = duplex(1024);
        let (mut remote_side, mut remote_app) = duplex(1024);
        let handler = DefaultHandler::new(Duration::from_secs(5)).with_buffer_size(4);

        client_app.write_all(b"hello socks").await.unwrap();
        drop(client_app);

        handler
            .read_from_client(&mut client_side, &mut remote_side, &CancellationToken::new())
            .await
            .unwrap();

        let mut received = Vec::new();
        remote_app.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello socks");
    }

    #[tokio::test]
    async fn test_copy_fails_after_idle_timeout() {
        let (_client_app, mut client_side) = duplex(1024);
        let (mut remote_side, _remote_app) = duplex(1024);
        let timeout = Duration::from_millis(100);
        let handler = DefaultHandler::new(timeout);

        let start = std::time::Instant::now();
        let err = handler
            .read_from_remote(&mut client_side, &mut remote_side, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(start.elapsed() >= timeout);
        let cause = err.downcast_ref::<TransportError>().unwrap();
        assert!(cause.is_timeout());
    }

    #[tokio::test]
    async fn test_copy_stops_on_cancel() {
        let (_client_app, mut client_side) = duplex(1024);
        let (mut remote_side, _remote_app) = duplex(1024);
        let handler = DefaultHandler::new(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = handler
            .read_from_client(&mut client_side, &mut remote_side, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::Cancelled)
        ));
    }
}
