use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use super::{LineSink, LineSource};
use crate::error::ChannelError;

/// Frames outgoing commands onto a byte stream.
pub struct LineWriter<W> {
    inner: W,
}

impl<W> LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W> LineSink for LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, line: &str) -> Result<(), ChannelError> {
        // One buffer so the line and its terminator go out in a single write.
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');

        self.inner
            .write_all(&frame)
            .await
            .map_err(ChannelError::Write)?;
        self.inner.flush().await.map_err(ChannelError::Write)
    }
}

/// Splits a byte stream into lines.
///
/// Partially received lines live in `pending` rather than in the future,
/// so dropping a `next_line` call mid-line loses nothing.
pub struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
    finished: bool,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
            finished: false,
        }
    }
}

#[async_trait]
impl<R> LineSource for LineReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
        if self.finished {
            return Ok(None);
        }

        self.inner
            .read_until(b'\n', &mut self.pending)
            .await
            .map_err(ChannelError::Read)?;

        if self.pending.last() != Some(&b'\n') {
            // read_until only stops short of the delimiter at end of stream.
            if !self.pending.is_empty() {
                debug!(
                    bytes = self.pending.len(),
                    "discarding unterminated trailing worker output"
                );
            }
            self.pending.clear();
            self.finished = true;
            return Ok(None);
        }

        self.pending.pop();
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Ok(Some(line))
    }
}
