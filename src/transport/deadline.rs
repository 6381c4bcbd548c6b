//! Native per-stream deadlines
//!
//! [`DeadlineStream`] wraps an async stream and fails reads or writes with
//! `io::ErrorKind::TimedOut` once their deadline has passed. A deadline is
//! an absolute instant; it stays armed until it is replaced or cleared.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Stream wrapper enforcing read and write deadlines
#[derive(Debug)]
pub struct DeadlineStream<S> {
    inner: S,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S> DeadlineStream<S> {
    /// Wrap `inner` with no deadlines set
    pub fn new(inner: S) -> Self {
        DeadlineStream {
            inner,
            read_deadline: None,
            write_deadline: None,
        }
    }

    /// Set or clear the read deadline
    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        rearm(&mut self.read_deadline, deadline);
    }

    /// Set or clear the write deadline
    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        rearm(&mut self.write_deadline, deadline);
    }

    /// Set both deadlines at once
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    /// Push both deadlines to `timeout` from now
    pub fn extend(&mut self, timeout: Duration) {
        self.set_deadline(Some(Instant::now() + timeout));
    }

    /// Get a reference to the wrapped stream
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner stream, dropping any deadlines
    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn rearm(slot: &mut Option<Pin<Box<Sleep>>>, deadline: Option<Instant>) {
    let Some(at) = deadline else {
        *slot = None;
        return;
    };
    if let Some(sleep) = slot.as_mut() {
        sleep.as_mut().reset(at);
        return;
    }
    *slot = Some(Box::pin(tokio::time::sleep_until(at)));
}

fn expired(slot: &mut Option<Pin<Box<Sleep>>>, cx: &mut Context<'_>) -> bool {
    match slot.as_mut() {
        Some(sleep) => sleep.as_mut().poll(cx).is_ready(),
        None => false,
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => Poll::Ready(result),
            Poll::Pending if expired(&mut this.read_deadline, cx) => Poll::Ready(Err(timed_out())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => Poll::Ready(result),
            Poll::Pending if expired(&mut this.write_deadline, cx) => {
                Poll::Ready(Err(timed_out()))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => Poll::Ready(result),
            Poll::Pending if expired(&mut this.write_deadline, cx) => {
                Poll::Ready(Err(timed_out()))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(result) => Poll::Ready(result),
            Poll::Pending if expired(&mut this.write_deadline, cx) => {
                Poll::Ready(Err(timed_out()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    const TIMEOUT: Duration = Duration::from_millis(150);

    #[tokio::test]
    async fn test_read_without_deadline_passes_through() {
        let (mut client, server) = duplex(64);
        let mut stream = DeadlineStream::new(server);

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();

        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_read_deadline_expires() {
        let (_client, server) = duplex(64);
        let mut stream = DeadlineStream::new(server);
        stream.extend(TIMEOUT);

        let start = std::time::Instant::now();
        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(start.elapsed() >= TIMEOUT);
        assert!(TransportError::from(err).is_timeout());
    }

    #[tokio::test]
    async fn test_ready_data_wins_over_expired_deadline() {
        let (mut client, server) = duplex(64);
        let mut stream = DeadlineStream::new(server);
        stream.set_read_deadline(Some(Instant::now()));
        client.write_all(b"late").await.unwrap();

        let mut buf = [0u8; 4];
        let n = stream.read(&mut buf).await.unwrap();

        assert_eq!(&buf[..n], b"late");
    }

    #[tokio::test]
    async fn test_extend_pushes_deadline_forward() {
        let (mut client, server) = duplex(64);
        let mut stream = DeadlineStream::new(server);

        for _ in 0..3 {
            stream.extend(TIMEOUT);
            tokio::time::sleep(TIMEOUT / 3).await;
            client.write_all(b"x").await.unwrap();
            let mut buf = [0u8; 1];
            stream.read_exact(&mut buf).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_clearing_deadline_disarms_it() {
        let (mut client, server) = duplex(64);
        let mut stream = DeadlineStream::new(server);
        stream.set_read_deadline(Some(Instant::now()));
        stream.set_read_deadline(None);

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            client.write_all(b"ok").await.unwrap();
            client
        });

        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_write_deadline_expires() {
        // Nobody drains the pipe, so writes block once it is full.
        let (_client, server) = duplex(8);
        let mut stream = DeadlineStream::new(server);
        stream.set_write_deadline(Some(Instant::now() + TIMEOUT));

        let err = stream.write_all(&[0u8; 64]).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
