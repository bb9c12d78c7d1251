//! Diagnostic event bus for the dispatcher.
//!
//! The dispatcher emits via [`EventBus::emit`]; anything interested in
//! wire-level activity (tests, the console, future metrics) subscribes via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so a slow
//! or absent listener never stalls dispatch.

use tokio::sync::broadcast;

/// Things the dispatcher did or saw.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A command was written to the worker.
    Written { text: String, expects_reply: bool },
    /// Writing a command failed; its caller got an error.
    WriteFailed { text: String },
    /// The in-flight command was resolved (`ok == false` on failure).
    Resolved { ok: bool },
    /// A non-reply line arrived while a reply was awaited.
    Noise { line: String },
    /// Output arrived while nothing was in flight.
    Stray { line: String },
    /// The worker's output ended; the dispatcher is finished.
    Closed,
}

#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit to all current subscribers. Returns how many will see it.
    pub fn emit(&self, event: DispatchEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted from now on (no replay).
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
