//! Agent-facing `IStream`/`OStream` abstractions (§4.4.1), reused here at
//! the agent layer rather than only inside the remote stream factory:
//! `Agent::accept`/`Agent::source` hand the engine a `Box<dyn IStream>` or
//! `Box<dyn OStream>` backed by whatever the agent actually reads from or
//! writes to — a local file, a buffered index dump, or (on the receiving
//! end) a delta-applying sink.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A source of bytes an agent hands the engine to send or to replay a base
/// against. `read` returns `Ok(0)` at end of stream, matching
/// `fsyncd_streams::MemIoReader::read`'s contract.
#[async_trait]
pub trait IStream: Send {
    /// Reads up to `buf.len()` bytes, returning `Ok(0)` at EOF.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// A sink of bytes an agent hands the engine to receive into.
#[async_trait]
pub trait OStream: Send {
    /// Writes all of `buf`; never a short write.
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Signals that no more bytes will ever be written, letting the sink
    /// finalize (e.g. apply a buffered delta and promote a staging file).
    async fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Adapts any [`tokio::io::AsyncRead`] (e.g. an open `tokio::fs::File`) to
/// [`IStream`].
pub struct FileIStream<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin + Send> FileIStream<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> IStream for FileIStream<R> {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).await
    }
}

/// Adapts any [`tokio::io::AsyncWrite`] to [`OStream`]; `finish` flushes.
pub struct FileOStream<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> FileOStream<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OStream for FileOStream<W> {
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(buf).await
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }
}

/// Adapts an in-memory byte slice to [`IStream`], for agents whose source is
/// already fully materialized (e.g. [`crate::index_agent::IndexAgent`]'s
/// encoded directory listing).
pub struct BufferIStream {
    data: std::io::Cursor<Vec<u8>>,
}

impl BufferIStream {
    /// Wraps `data` for sequential reading.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: std::io::Cursor::new(data) }
    }
}

#[async_trait]
impl IStream for BufferIStream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(&mut self.data, buf)
    }
}

/// Adapts `fsyncd_streams::MemIoReader`/`MemIoWriter` to [`IStream`]/[`OStream`].
pub struct MemIStream(
    /// The underlying pipe reader.
    pub fsyncd_streams::MemIoReader,
);

#[async_trait]
impl IStream for MemIStream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf).await.map_err(|e| std::io::Error::other(e.to_string()))
    }
}

/// See [`MemIStream`].
pub struct MemOStream(
    /// The underlying pipe writer.
    pub fsyncd_streams::MemIoWriter,
);

#[async_trait]
impl OStream for MemOStream {
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.0.write(buf).await.map_err(|e| std::io::Error::other(e.to_string())).map(|_| ())
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        self.0.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_istream_reads_to_eof() {
        let mut stream = BufferIStream::new(b"hello".to_vec());
        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mem_stream_round_trips() {
        let (reader, writer) = fsyncd_streams::mem_io::pair(64, 4);
        let mut ostream = MemOStream(writer);
        ostream.write(b"payload").await.unwrap();
        ostream.finish().await.unwrap();

        let mut istream = MemIStream(reader);
        let mut collected = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = istream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"payload");
    }
}
