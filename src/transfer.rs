//! Chunked byte streaming between files and sockets.
//!
//! The protocol has no length prefix: a payload ends when the sender
//! half-closes its write side, so the receiving loop runs until the source
//! reports end-of-stream. Bytes arrive in order (TCP); no integrity check is
//! performed, and a connection dropped mid-transfer leaves whatever was
//! already written in the sink.

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::CHUNK_SIZE;

/// Copy the source to the sink in fixed-size chunks until the source is
/// exhausted, then flush. Returns the number of bytes moved. Used on the
/// sending side of a transfer (file into socket).
pub async fn send_file<R, W>(source: &mut R, sink: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    copy_chunks(source, sink).await
}

/// Copy from the source until it reports end-of-stream, writing each chunk to
/// the sink. EOF is the only termination signal; there is no byte count to
/// satisfy. Used on the receiving side (socket into file).
pub async fn receive_file<R, W>(source: &mut R, sink: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    copy_chunks(source, sink).await
}

async fn copy_chunks<R, W>(source: &mut R, sink: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    sink.flush().await?;
    Ok(total)
}
