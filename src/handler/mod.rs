//! Connection handlers for Socksrelay
//!
//! A [`ProxyHandler`] decides how a CONNECT request reaches its destination
//! and how bytes move once it has. The proxy holds one handler and shares it
//! between every connection as an `Arc<dyn ProxyHandler>`.
//!
//! # Implementing a Handler
//!
//! Only [`init`](ProxyHandler::init) and the two copy operations are
//! required. [`close`](ProxyHandler::close) and
//! [`refresh`](ProxyHandler::refresh) default to no-ops.
//!
//! ```rust,ignore
//! use socksrelay::handler::{Backend, ProxyHandler};
//!
//! #[derive(Debug)]
//! struct Upstream { addr: std::net::SocketAddr }
//!
//! #[async_trait::async_trait]
//! impl ProxyHandler for Upstream {
//!     async fn init(&self, _request: &Request) -> Result<Backend, ProxyError> {
//!         let stream = TcpStream::connect(self.addr)
//!             .await
//!             .map_err(|e| ProxyError::new(ReplyReason::HostUnreachable, e))?;
//!         Ok(Backend::tcp(stream))
//!     }
//!     // read_from_client / read_from_remote ...
//! }
//! ```

mod default;

pub use default::DefaultHandler;

use crate::error::ProxyError;
use crate::socks::{Request, TargetAddr};
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Policy for dialing, copying, keeping alive and cleaning up a connection.
///
/// The copy operations receive the already-split halves of the client and
/// backend streams. Returning `Ok(())` on end-of-stream is expected; any
/// error is reported by the relay as `HostUnreachable`.
#[async_trait]
pub trait ProxyHandler: Send + Sync + Debug {
    /// Open the backend connection for a parsed request.
    ///
    /// The reason carried by the error is sent to the client.
    async fn init(&self, request: &Request) -> Result<Backend, ProxyError>;

    /// Copy client bytes to the backend until end-of-stream.
    async fn read_from_client(
        &self,
        client: &mut (dyn AsyncRead + Unpin + Send),
        remote: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;

    /// Copy backend bytes to the client until end-of-stream.
    async fn read_from_remote(
        &self,
        remote: &mut (dyn AsyncRead + Unpin + Send),
        client: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;

    /// Release per-connection resources.
    ///
    /// Called exactly once for every accepted connection, whatever the
    /// outcome. Errors are logged.
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Keepalive work run alongside the relay.
    ///
    /// `cancel` fires once both copy directions have finished.
    async fn refresh(&self, _cancel: CancellationToken) {}
}

/// Stream trait object used for backend connections
pub trait StreamDyn: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Debug> StreamDyn for T {}

/// Boxed backend stream
pub type BoxedStream = Box<dyn StreamDyn>;

/// An open backend connection returned by [`ProxyHandler::init`]
#[derive(Debug)]
pub struct Backend {
    /// The backend stream
    pub stream: BoxedStream,
    /// Address reported to the client in the success reply
    pub bound_addr: Option<TargetAddr>,
}

impl Backend {
    /// Wrap any stream, with no bound address
    pub fn new<S: StreamDyn + 'static>(stream: S) -> Self {
        Backend {
            stream: Box::new(stream),
            bound_addr: None,
        }
    }

    /// Wrap a TCP stream, reporting its local address as the bound address
    pub fn tcp(stream: TcpStream) -> Self {
        let bound_addr = stream.local_addr().ok().map(TargetAddr::from);
        Backend {
            stream: Box::new(stream),
            bound_addr,
        }
    }

    /// Set the bound address
    pub fn with_bound_addr(mut self, addr: impl Into<TargetAddr>) -> Self {
        self.bound_addr = Some(addr.into());
        self
    }
}
