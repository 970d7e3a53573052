//! Bounded in-memory byte pipe (§4.4.1 `MemIoStream`).
//!
//! A block-list FIFO shared between a reader and a writer half. Writes are
//! split into fixed-size blocks; the oldest block is freed as soon as a
//! reader has fully consumed it, so total memory use is bounded by
//! `block_size * max_blocks` regardless of how much data ever passes
//! through — the mechanism the remote stream factory relies on for
//! backpressure (§4.4.4, §8 scenario S4).

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use crate::error::{Result, StreamError};

/// Observable state of one end of a [`MemIoStream`] pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// More data may still arrive (or, for a writer, more may still be sent).
    Ok,
    /// The writer closed normally; no more data will ever arrive.
    Eof,
    /// The writer closed abnormally (§4.4.4 Timeout, or an upstream error).
    Err,
}

struct Inner {
    block_size: usize,
    max_blocks: usize,
    state: Mutex<State>,
    readable: Notify,
    writable: Notify,
}

struct State {
    blocks: VecDeque<Bytes>,
    head_consumed: usize,
    closed: bool,
    errored: bool,
}

/// The read half of a [`MemIoStream`] pipe.
#[derive(Clone)]
pub struct MemIoReader {
    inner: Arc<Inner>,
}

/// The write half of a [`MemIoStream`] pipe.
#[derive(Clone)]
pub struct MemIoWriter {
    inner: Arc<Inner>,
}

/// Builds a connected reader/writer pair bounded to `block_size * max_blocks`
/// bytes of outstanding, unread data.
#[must_use]
pub fn pair(block_size: usize, max_blocks: usize) -> (MemIoReader, MemIoWriter) {
    let inner = Arc::new(Inner {
        block_size: block_size.max(1),
        max_blocks: max_blocks.max(1),
        state: Mutex::new(State {
            blocks: VecDeque::new(),
            head_consumed: 0,
            closed: false,
            errored: false,
        }),
        readable: Notify::new(),
        writable: Notify::new(),
    });
    (MemIoReader { inner: Arc::clone(&inner) }, MemIoWriter { inner })
}

impl MemIoReader {
    /// Reads up to `buf.len()` bytes, blocking until at least one byte is
    /// available. Returns `Ok(0)` once the writer has closed and every
    /// buffered byte has been consumed (§4.4.1 `IStream::read`).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            {
                let mut state = self.inner.state.lock().await;
                if let Some(front) = state.blocks.front() {
                    let available = front.len() - state.head_consumed;
                    let n = available.min(buf.len());
                    buf[..n].copy_from_slice(&front[state.head_consumed..state.head_consumed + n]);
                    state.head_consumed += n;
                    if state.head_consumed == front.len() {
                        state.blocks.pop_front();
                        state.head_consumed = 0;
                        self.inner.writable.notify_one();
                    }
                    return Ok(n);
                }
                if state.errored {
                    return Err(StreamError::Closed);
                }
                if state.closed {
                    return Ok(0);
                }
            }
            self.inner.readable.notified().await;
        }
    }

    /// Current status as observed by the reader.
    pub async fn status(&self) -> StreamStatus {
        let state = self.inner.state.lock().await;
        if !state.blocks.is_empty() {
            StreamStatus::Ok
        } else if state.errored {
            StreamStatus::Err
        } else if state.closed {
            StreamStatus::Eof
        } else {
            StreamStatus::Ok
        }
    }
}

impl MemIoWriter {
    /// Writes all of `data`, splitting it into `block_size` chunks and
    /// blocking while the pipe holds `max_blocks` already (§4.4.4
    /// Backpressure). A short write never happens: either every byte is
    /// accepted or an error is returned.
    pub async fn write(&self, data: &[u8]) -> Result<usize> {
        for chunk in data.chunks(self.inner.block_size) {
            loop {
                let mut state = self.inner.state.lock().await;
                if state.closed || state.errored {
                    return Err(StreamError::Closed);
                }
                if state.blocks.len() < self.inner.max_blocks {
                    state.blocks.push_back(Bytes::copy_from_slice(chunk));
                    self.inner.readable.notify_one();
                    break;
                }
                drop(state);
                self.inner.writable.notified().await;
            }
        }
        Ok(data.len())
    }

    /// Closes the pipe normally; subsequent reads drain buffered data then
    /// return `Ok(0)`.
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        state.closed = true;
        self.inner.readable.notify_waiters();
    }

    /// Closes the pipe abnormally; the reader observes [`StreamStatus::Err`]
    /// once buffered data (if any) has been drained (§4.4.4 Timeout).
    pub async fn close_with_error(&self) {
        let mut state = self.inner.state.lock().await;
        state.errored = true;
        self.inner.readable.notify_waiters();
    }

    /// Current status as observed by the writer.
    pub async fn status(&self) -> StreamStatus {
        let state = self.inner.state.lock().await;
        if state.errored {
            StreamStatus::Err
        } else if state.closed {
            StreamStatus::Eof
        } else {
            StreamStatus::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_write_round_trips_exactly() {
        let (reader, writer) = pair(4, 4);
        let payload = b"the quick brown fox jumps over the lazy dog";
        let write_task = {
            let writer = writer.clone();
            let payload = payload.to_vec();
            tokio::spawn(async move {
                writer.write(&payload).await.unwrap();
                writer.close().await;
            })
        };

        let mut collected = Vec::new();
        let mut buf = [0u8; 5];
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        write_task.await.unwrap();
        assert_eq!(collected, payload);
        assert_eq!(reader.status().await, StreamStatus::Eof);
    }

    #[tokio::test]
    async fn writer_blocks_once_max_blocks_buffered() {
        let (reader, writer) = pair(1, 2);
        writer.write(b"a").await.unwrap();
        writer.write(b"b").await.unwrap();

        let writer2 = writer.clone();
        let blocked = tokio::spawn(async move { writer2.write(b"c").await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        let mut buf = [0u8; 1];
        reader.read(&mut buf).await.unwrap();
        blocked.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn close_with_error_is_observed_after_drain() {
        let (reader, writer) = pair(4, 4);
        writer.write(b"ok").await.unwrap();
        writer.close_with_error().await;

        let mut buf = [0u8; 4];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ok");
        let err = reader.read(&mut buf).await;
        assert!(matches!(err, Err(StreamError::Closed)));
    }
}
