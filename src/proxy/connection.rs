//! Per-connection state machine
//!
//! Handshake, request, dial, reply, relay, in that order. The first failure
//! ends the connection. Until the success reply has been written, a failure
//! is reported to the client with exactly one error reply.

use crate::error::{ProxyError, ReplyReason};
use crate::handler::{Backend, ProxyHandler};
use crate::relay::relay;
use crate::socks::{
    encode_error_reply, encode_reply, method_selection, parse_header, parse_request,
    select_method, Request, TargetAddr,
};
use crate::transport::{read_message, write_all};
use bytes::{Buf, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One accepted client, driven from greeting to teardown by [`run`](Connection::run)
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    pending: BytesMut,
    timeout: Duration,
    handler: Arc<dyn ProxyHandler>,
    shutdown: CancellationToken,
    replied: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a connection over an accepted stream
    ///
    /// `timeout` bounds every read and write during negotiation. `shutdown`
    /// interrupts negotiation and dialing and keeps relay copies from starting.
    pub fn new(
        stream: S,
        timeout: Duration,
        handler: Arc<dyn ProxyHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        Connection {
            stream,
            pending: BytesMut::new(),
            timeout,
            handler,
            shutdown,
            replied: false,
        }
    }

    /// Serve the connection to completion
    ///
    /// `handler.close()` is always called before this returns.
    pub async fn run(mut self) -> Result<(), ProxyError> {
        let result = self.serve().await;
        self.finish(&result).await;
        result
    }

    async fn serve(&mut self) -> Result<(), ProxyError> {
        self.handshake().await?;
        let request = self.read_request().await?;
        let mut backend = self.dial(&request).await?;
        self.reply_success(backend.bound_addr.clone()).await?;

        info!("SOCKS5 tunnel established to {}", request.destination);

        self.forward_pending(&mut backend).await?;
        relay(
            &mut self.stream,
            backend.stream,
            self.handler.as_ref(),
            &self.shutdown,
        )
        .await
        .into_result()
    }

    async fn handshake(&mut self) -> Result<(), ProxyError> {
        self.read_more(ReplyReason::ConnectionRefused).await?;

        let header = parse_header(&self.pending)
            .map_err(|e| ProxyError::new(ReplyReason::ConnectionRefused, e))?;
        self.pending.advance(header.encoded_len().min(self.pending.len()));

        let method = select_method(&header)?;
        debug!("Selected authentication method {:#04x}", method);

        write_all(
            &mut self.stream,
            &method_selection(method),
            self.timeout,
            &self.shutdown,
        )
        .await
        .map_err(|e| ProxyError::new(ReplyReason::GeneralFailure, e))
    }

    async fn read_request(&mut self) -> Result<Request, ProxyError> {
        if self.pending.is_empty() {
            self.read_more(ReplyReason::GeneralFailure).await?;
        }

        let request = parse_request(&self.pending)?;
        self.pending.advance(request.encoded_len().min(self.pending.len()));

        debug!("Request: {} {}", request.command, request.destination);
        Ok(request)
    }

    async fn dial(&self, request: &Request) -> Result<Backend, ProxyError> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(ProxyError::msg(
                ReplyReason::GeneralFailure,
                "proxy is shutting down",
            )),
            result = self.handler.init(request) => result,
        }
    }

    async fn reply_success(&mut self, bound: Option<TargetAddr>) -> Result<(), ProxyError> {
        self.replied = true;
        let reply = encode_reply(bound.as_ref(), ReplyReason::Succeeded);
        write_all(&mut self.stream, &reply, self.timeout, &self.shutdown)
            .await
            .map_err(|e| ProxyError::new(ReplyReason::GeneralFailure, e))
    }

    async fn forward_pending(&mut self, backend: &mut Backend) -> Result<(), ProxyError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        debug!("Forwarding {} pipelined bytes", self.pending.len());
        write_all(
            &mut backend.stream,
            &self.pending,
            self.timeout,
            &self.shutdown,
        )
        .await
        .map_err(|e| ProxyError::new(ReplyReason::HostUnreachable, e))?;
        self.pending.clear();
        Ok(())
    }

    async fn read_more(&mut self, reason: ReplyReason) -> Result<(), ProxyError> {
        read_message(
            &mut self.stream,
            &mut self.pending,
            self.timeout,
            &self.shutdown,
        )
        .await
        .map(|_| ())
        .map_err(|e| ProxyError::new(reason, e))
    }

    async fn finish(&mut self, result: &Result<(), ProxyError>) {
        match result {
            Ok(()) => debug!("Connection closed"),
            Err(e) if self.replied => info!("Connection ended with error: {}", e),
            Err(e) => {
                debug!("Negotiation failed: {}", e);
                self.replied = true;
                let reply = encode_error_reply(e.reason());
                // Sent even while shutting down; the timeout still bounds it.
                if let Err(err) =
                    write_all(&mut self.stream, &reply, self.timeout, &CancellationToken::new())
                        .await
                {
                    debug!("Failed to send error reply: {}", err);
                }
            }
        }

        if let Err(e) = self.handler.close().await {
            warn!("Handler close failed: {:#}", e);
        }
    }
}
