use std::sync::Arc;

use tokio::sync::broadcast;

use crate::decoder::Reply;
use crate::error::DispatchError;
use crate::events::{DispatchEvent, EventBus};
use crate::queue::{CommandQueue, PendingReply};

/// What callers hold. Cloneable; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    queue: CommandQueue,
    events: Arc<EventBus>,
}

impl DispatcherHandle {
    pub(crate) fn new(queue: CommandQueue, events: Arc<EventBus>) -> Self {
        Self { queue, events }
    }

    /// Queue a command and return immediately with its pending result.
    /// Multi-line text is rejected without being queued, since the worker
    /// would read it as several commands.
    pub fn enqueue(&self, text: impl Into<String>, expects_reply: bool) -> PendingReply {
        let text = text.into();
        if text.contains(['\n', '\r']) {
            return PendingReply::ready(Err(DispatchError::InvalidCommand(
                "command must be a single line".to_string(),
            )));
        }
        self.queue.enqueue(text, expects_reply)
    }

    /// Queue a command and wait for its result. Waits indefinitely unless
    /// the worker goes away; callers wanting a deadline wrap this in
    /// `tokio::time::timeout`.
    pub async fn submit(
        &self,
        text: impl Into<String>,
        expects_reply: bool,
    ) -> Result<Reply, DispatchError> {
        self.enqueue(text, expects_reply).wait().await
    }

    /// Commands queued behind the one in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True once the worker's output has ended and nothing more will be
    /// dispatched.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }
}
