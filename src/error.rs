//! Error types shared by the channel and dispatcher layers.

use std::io;

use thiserror::Error;

/// Failures of the byte streams connecting us to the worker.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("write to worker failed: {0}")]
    Write(#[source] io::Error),
    #[error("read from worker failed: {0}")]
    Read(#[source] io::Error),
}

/// Why a submitted command did not produce a reply.
///
/// Cloneable so a single failure can be handed to several waiting callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The command could not be written to the worker's stdin.
    #[error("worker rejected command: {0}")]
    Write(String),
    /// The worker's output stream ended; no reply can ever arrive.
    #[error("worker is no longer running")]
    Closed,
    /// The command text cannot be framed as a single protocol line.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl From<ChannelError> for DispatchError {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::Write(e) => Self::Write(e.to_string()),
            ChannelError::Read(_) => Self::Closed,
        }
    }
}
