//! Cooperative deadline enforcement
//!
//! Each operation is raced against a timer and a cancellation token. When
//! the timer wins the in-flight I/O future is dropped and
//! [`TransportError::Timeout`] is returned.

use crate::error::TransportError;
use crate::socks::{MAX_MESSAGE_SIZE, READ_CHUNK_SIZE};
use bytes::BytesMut;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Run `fut` until it completes, `timeout` elapses or `cancel` fires
pub async fn bounded<F, T>(
    fut: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(TransportError::Timeout),
        },
    }
}

/// Read one negotiation message into `buf`
///
/// Reads in [`READ_CHUNK_SIZE`] chunks and stops at the first short read,
/// which marks the end of what the client sent, or once [`MAX_MESSAGE_SIZE`]
/// bytes are buffered; anything beyond that stays unread in `reader`.
/// End-of-stream before any byte arrived is [`TransportError::Closed`].
/// Returns the number of bytes appended to `buf`.
pub async fn read_message<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<usize, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    bounded(read_until_short(reader, buf), timeout, cancel).await
}

async fn read_until_short<R>(reader: &mut R, buf: &mut BytesMut) -> Result<usize, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut total = 0;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if total == 0 {
                return Err(TransportError::Closed);
            }
            return Ok(total);
        }

        total += n;
        buf.extend_from_slice(&chunk[..n]);

        if n < READ_CHUNK_SIZE || total >= MAX_MESSAGE_SIZE {
            return Ok(total);
        }
    }
}

/// Write all of `data`, flushing afterwards
pub async fn write_all<W>(
    writer: &mut W,
    data: &[u8],
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    bounded(
        async {
            writer.write_all(data).await?;
            writer.flush().await?;
            Ok::<(), TransportError>(())
        },
        timeout,
        cancel,
    )
    .await
}
