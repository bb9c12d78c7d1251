//! FIFO of caller requests waiting for the worker.
//!
//! Any number of [`CommandQueue`] clones may enqueue; exactly one
//! [`QueueReceiver`] (owned by the dispatcher) removes entries, one at a
//! time, in insertion order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::decoder::Reply;
use crate::error::DispatchError;

pub type DispatchResult = Result<Reply, DispatchError>;

/// One caller request awaiting transmission.
#[derive(Debug)]
pub struct QueuedCommand {
    pub text: String,
    pub expects_reply: bool,
    pub completion: Completion,
}

/// Resolves a caller's [`PendingReply`]. Consumed on use, so it can only
/// ever be resolved once.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<DispatchResult>,
}

impl Completion {
    pub fn resolve(self, result: DispatchResult) {
        if self.tx.send(result).is_err() {
            debug!("caller stopped waiting; result dropped");
        }
    }

    /// True once the caller has dropped its [`PendingReply`].
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The caller's end of a queued command.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<DispatchResult>,
}

impl PendingReply {
    /// A handle that is already resolved with `result`.
    pub fn ready(result: DispatchResult) -> Self {
        let (completion, pending) = completion_pair();
        completion.resolve(result);
        pending
    }

    /// Wait for the dispatcher to resolve this command. A completion that
    /// was dropped without being resolved reads as [`DispatchError::Closed`].
    pub async fn wait(self) -> DispatchResult {
        self.rx.await.unwrap_or(Err(DispatchError::Closed))
    }
}

pub fn completion_pair() -> (Completion, PendingReply) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, PendingReply { rx })
}

/// Create a connected producer/consumer pair.
pub fn command_queue() -> (CommandQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        CommandQueue {
            tx,
            depth: Arc::clone(&depth),
        },
        QueueReceiver { rx, depth },
    )
}

/// Producer side. Cheap to clone; never blocks.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<QueuedCommand>,
    depth: Arc<AtomicUsize>,
}

impl CommandQueue {
    /// Append a command to the tail. If the consumer has closed the queue
    /// the returned handle is already resolved with [`DispatchError::Closed`].
    pub fn enqueue(&self, text: impl Into<String>, expects_reply: bool) -> PendingReply {
        let (completion, pending) = completion_pair();
        let command = QueuedCommand {
            text: text.into(),
            expects_reply,
            completion,
        };

        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(rejected)) = self.tx.send(command) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            rejected.completion.resolve(Err(DispatchError::Closed));
        }
        pending
    }

    /// Commands accepted but not yet taken by the dispatcher.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the consumer has closed the queue or gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the dispatcher.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<QueuedCommand>,
    depth: Arc<AtomicUsize>,
}

impl QueueReceiver {
    /// Remove the head, waiting for one if the queue is empty. `None` once
    /// every producer is gone (or the queue is closed) and nothing is left.
    /// Cancel-safe.
    pub async fn dequeue_next(&mut self) -> Option<QueuedCommand> {
        let command = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(command)
    }

    /// Remove the head if one is immediately available.
    pub fn try_dequeue(&mut self) -> Option<QueuedCommand> {
        let command = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(command)
    }

    /// Stop accepting new commands. Already buffered ones stay available.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Remove everything still buffered, in order.
    pub fn drain(&mut self) -> Vec<QueuedCommand> {
        let mut drained = Vec::new();
        while let Some(command) = self.try_dequeue() {
            drained.push(command);
        }
        drained
    }
}
