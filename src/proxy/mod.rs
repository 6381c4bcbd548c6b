//! SOCKS5 listener
//!
//! [`Proxy`] owns the listening socket. Each accepted client is served by a
//! [`Connection`] on its own task, inside a `conn` tracing span.

mod connection;

pub use connection::Connection;

use crate::error::SocksRelayError;
use crate::handler::ProxyHandler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Default per-operation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to listen on; port 0 picks a free port
    pub bind_addr: SocketAddr,
    /// Deadline for every read and write during negotiation
    pub timeout: Duration,
    /// Handler shared by every connection
    pub handler: Arc<dyn ProxyHandler>,
}

impl ProxyConfig {
    /// Create a configuration with the default timeout
    pub fn new(bind_addr: SocketAddr, handler: Arc<dyn ProxyHandler>) -> Self {
        ProxyConfig {
            bind_addr,
            timeout: DEFAULT_TIMEOUT,
            handler,
        }
    }

    /// Override the per-operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A SOCKS5 proxy server
#[derive(Debug)]
pub struct Proxy {
    config: ProxyConfig,
    local_addr: Option<SocketAddr>,
    shutdown: CancellationToken,
    closed: CancellationToken,
}

impl Proxy {
    /// Create a proxy; nothing is bound until [`start`](Proxy::start)
    pub fn new(config: ProxyConfig) -> Self {
        Proxy {
            config,
            local_addr: None,
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
        }
    }

    /// Bind the listener and spawn the accept loop
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub async fn start(&mut self) -> Result<SocketAddr, SocksRelayError> {
        if self.local_addr.is_some() {
            return Err(SocksRelayError::AlreadyStarted);
        }

        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| SocksRelayError::Bind {
                addr: self.config.bind_addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!("SOCKS5 proxy listening on {}", local_addr);

        tokio::spawn(accept_loop(
            listener,
            self.config.clone(),
            self.shutdown.clone(),
            self.closed.clone(),
        ));

        Ok(local_addr)
    }

    /// Stop accepting connections
    ///
    /// Connections still negotiating are interrupted; relays already running
    /// finish on their own. Calling this more than once has no further effect.
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Stopping SOCKS5 proxy");
        }
        self.shutdown.cancel();
    }

    /// Wait until the accept loop has exited
    ///
    /// Returns immediately if the proxy was never started.
    pub async fn wait(&self) {
        if self.local_addr.is_some() {
            self.closed.cancelled().await;
        }
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the accept loop is running
    pub fn is_running(&self) -> bool {
        self.local_addr.is_some() && !self.closed.is_cancelled()
    }

    /// Token cancelled by [`stop`](Proxy::stop)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: ProxyConfig,
    shutdown: CancellationToken,
    closed: CancellationToken,
) {
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("SOCKS5 proxy shutting down");
                break;
            }
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    next_id += 1;
                    let conn = Connection::new(
                        stream,
                        config.timeout,
                        config.handler.clone(),
                        shutdown.clone(),
                    );
                    let span = info_span!("conn", id = next_id, %peer);
                    tokio::spawn(
                        async move {
                            // Failures are logged inside the connection.
                            let _ = conn.run().await;
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    drop(listener);
    closed.cancel();
    info!("SOCKS5 proxy stopped");
}
