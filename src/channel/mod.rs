//! Line-framed access to the worker's byte streams.
//!
//! The dispatcher only sees the two traits below. [`pipe`] provides the
//! implementations for any tokio stream: child process pipes in
//! production, in-memory duplex pipes in tests.

pub mod pipe;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use pipe::{LineReader, LineWriter};

/// Write side: one command per line.
#[async_trait]
pub trait LineSink: Send {
    /// Write `line` followed by a newline and flush it.
    async fn send(&mut self, line: &str) -> Result<(), ChannelError>;
}

/// Read side: an endless, non-restartable sequence of complete lines.
#[async_trait]
pub trait LineSource: Send {
    /// Next complete line without its terminator, or `None` once the
    /// stream has ended. Must be cancel-safe.
    async fn next_line(&mut self) -> Result<Option<String>, ChannelError>;
}
