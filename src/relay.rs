//! Relay engine
//!
//! Drives the handler's two copy operations over the client and backend
//! streams, with the handler's keepalive running alongside. Both directions
//! always run to completion; one failing never cuts the other short.

use crate::error::{ProxyError, ReplyReason};
use crate::handler::{BoxedStream, ProxyHandler};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of both relay directions
#[derive(Debug)]
pub struct RelayOutcome {
    /// Outcome of `read_from_client`
    pub client_to_remote: anyhow::Result<()>,
    /// Outcome of `read_from_remote`
    pub remote_to_client: anyhow::Result<()>,
}

impl RelayOutcome {
    /// Whether both directions finished cleanly
    pub fn is_ok(&self) -> bool {
        self.client_to_remote.is_ok() && self.remote_to_client.is_ok()
    }

    /// Collapse into the first error, client to remote first
    pub fn into_result(self) -> Result<(), ProxyError> {
        self.client_to_remote
            .and(self.remote_to_client)
            .map_err(|e| ProxyError::new(ReplyReason::HostUnreachable, e))
    }
}

/// Relay bytes between `client` and `remote` until both directions finish
///
/// A fresh cancellation scope is handed to the copies and to
/// `handler.refresh`; it is cancelled once both copies return. When
/// `shutdown` is already cancelled a copy is skipped and counts as success.
pub async fn relay<C>(
    client: &mut C,
    remote: BoxedStream,
    handler: &dyn ProxyHandler,
    shutdown: &CancellationToken,
) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite + Unpin + Send,
{
    let scope = CancellationToken::new();
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut remote_read, mut remote_write) = tokio::io::split(remote);

    let upstream = async {
        if shutdown.is_cancelled() {
            debug!("Shutting down, skipping client -> remote copy");
            return Ok(());
        }
        handler
            .read_from_client(&mut client_read, &mut remote_write, &scope)
            .await
    };

    let downstream = async {
        if shutdown.is_cancelled() {
            debug!("Shutting down, skipping remote -> client copy");
            return Ok(());
        }
        handler
            .read_from_remote(&mut remote_read, &mut client_write, &scope)
            .await
    };

    let copies = async {
        let results = tokio::join!(upstream, downstream);
        scope.cancel();
        results
    };

    let keepalive = async {
        tokio::select! {
            biased;
            _ = handler.refresh(scope.clone()) => {}
            _ = scope.cancelled() => {}
        }
    };

    let ((client_to_remote, remote_to_client), ()) = tokio::join!(copies, keepalive);

    if let Err(e) = &client_to_remote {
        debug!("client -> remote ended with error: {:#}", e);
    }
    if let Err(e) = &remote_to_client {
        debug!("remote -> client ended with error: {:#}", e);
    }

    RelayOutcome {
        client_to_remote,
        remote_to_client,
    }
}
