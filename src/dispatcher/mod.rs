//! The sequential command dispatcher.
//!
//! The worker protocol has no correlation ids, so replies can only be
//! attributed by position: the dispatcher writes a command, and if a reply
//! is expected it writes nothing else until the next structured line comes
//! back. One task owns the channel, the decoder, the queue's consumer end
//! and the state; callers only ever touch the queue.
//!
//! ```text
//!            dequeue + write (reply expected)
//!   Idle ───────────────────────────────────────▶ AwaitingReply
//!    ▲ │ dequeue + write (no reply) / write error      │  │ noise
//!    │ └──────────┐                                    │  └──┐
//!    │            ▼                                    │     ▼
//!    └──────── Idle ◀──────── decoded reply ───────────┘  (stay)
//!
//!   any state ── worker output ends ──▶ Closed (terminal)
//! ```

mod handle;
mod state;

use std::mem;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{LineSink, LineSource};
use crate::decoder::{Decoded, Reply, ReplyDecoder};
use crate::error::{ChannelError, DispatchError};
use crate::events::{DispatchEvent, EventBus};
use crate::queue::{QueueReceiver, QueuedCommand, command_queue};

pub use handle::DispatcherHandle;
pub use state::Mode;
use state::DispatcherState;

pub struct Dispatcher {
    sink: Box<dyn LineSink>,
    source: Box<dyn LineSource>,
    decoder: Box<dyn ReplyDecoder>,
    queue: QueueReceiver,
    events: Arc<EventBus>,
    state: DispatcherState,
}

impl Dispatcher {
    /// Build a dispatcher and the handle callers submit through. Nothing
    /// happens until [`Dispatcher::run`] is polled.
    pub fn new(
        sink: Box<dyn LineSink>,
        source: Box<dyn LineSource>,
        decoder: Box<dyn ReplyDecoder>,
    ) -> (Self, DispatcherHandle) {
        let (queue, receiver) = command_queue();
        let events = Arc::new(EventBus::default());
        let handle = DispatcherHandle::new(queue, Arc::clone(&events));
        let dispatcher = Self {
            sink,
            source,
            decoder,
            queue: receiver,
            events,
            state: DispatcherState::Idle,
        };
        (dispatcher, handle)
    }

    /// Build a dispatcher and run it on its own task.
    pub fn spawn(
        sink: Box<dyn LineSink>,
        source: Box<dyn LineSource>,
        decoder: Box<dyn ReplyDecoder>,
    ) -> (DispatcherHandle, JoinHandle<()>) {
        let (dispatcher, handle) = Self::new(sink, source, decoder);
        (handle, tokio::spawn(dispatcher.run()))
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Drive the state machine until the worker's output ends or every
    /// caller handle has been dropped.
    pub async fn run(mut self) {
        debug!("dispatcher started");
        loop {
            match self.state.mode() {
                Mode::Idle => {
                    tokio::select! {
                        // Output first, so closure is noticed before the
                        // next command is written into a dead pipe.
                        biased;
                        output = self.source.next_line() => self.on_idle_output(output),
                        next = self.queue.dequeue_next() => match next {
                            Some(command) => self.transmit(command).await,
                            None => {
                                debug!("all callers gone; dispatcher stopping");
                                return;
                            }
                        },
                    }
                }
                Mode::AwaitingReply => {
                    let output = self.source.next_line().await;
                    self.on_awaiting_output(output);
                }
                Mode::Closed => return,
            }
        }
    }

    /// Idle → write the head command. Stays Idle unless a reply is expected.
    async fn transmit(&mut self, command: QueuedCommand) {
        let QueuedCommand {
            text,
            expects_reply,
            completion,
        } = command;

        debug!(command = %text, expects_reply, "writing command");
        if completion.is_abandoned() {
            // Still written: the worker's state may depend on it.
            debug!(command = %text, "caller no longer waiting");
        }
        if let Err(error) = self.sink.send(&text).await {
            warn!(command = %text, %error, "could not write command to worker");
            self.events.emit(DispatchEvent::WriteFailed { text });
            completion.resolve(Err(DispatchError::from(error)));
            return;
        }

        self.events.emit(DispatchEvent::Written {
            text: text.clone(),
            expects_reply,
        });

        if expects_reply {
            self.state = DispatcherState::AwaitingReply {
                command: text,
                completion,
            };
        } else {
            completion.resolve(Ok(Reply::ack()));
            self.events.emit(DispatchEvent::Resolved { ok: true });
        }
    }

    fn on_idle_output(&mut self, output: Result<Option<String>, ChannelError>) {
        match output {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    return;
                }
                match self.decoder.decode(&line) {
                    Decoded::Reply(_) => warn!(%line, "discarding reply with no command in flight"),
                    Decoded::Noise => debug!(%line, "worker output"),
                }
                self.events.emit(DispatchEvent::Stray { line });
            }
            Ok(None) => self.close(),
            Err(error) => {
                warn!(%error, "lost worker output stream");
                self.close();
            }
        }
    }

    fn on_awaiting_output(&mut self, output: Result<Option<String>, ChannelError>) {
        let line = match output {
            Ok(Some(line)) => line,
            Ok(None) => return self.close(),
            Err(error) => {
                warn!(%error, "lost worker output stream");
                return self.close();
            }
        };

        match self.decoder.decode(&line) {
            Decoded::Reply(reply) => {
                if let DispatcherState::AwaitingReply {
                    command,
                    completion,
                } = mem::take(&mut self.state)
                {
                    debug!(%command, status = reply.status().unwrap_or_default(), "reply received");
                    completion.resolve(Ok(reply));
                    self.events.emit(DispatchEvent::Resolved { ok: true });
                }
            }
            Decoded::Noise => {
                if !line.trim().is_empty() {
                    debug!(%line, "ignoring non-reply output");
                }
                self.events.emit(DispatchEvent::Noise { line });
            }
        }
    }

    /// Terminal transition: fail the in-flight command and everything still
    /// queued, without writing any of them.
    fn close(&mut self) {
        if let DispatcherState::AwaitingReply {
            command,
            completion,
        } = mem::replace(&mut self.state, DispatcherState::Closed)
        {
            warn!(%command, "worker output ended with a command in flight");
            completion.resolve(Err(DispatchError::Closed));
            self.events.emit(DispatchEvent::Resolved { ok: false });
        }

        self.queue.close();
        let stranded = self.queue.drain();
        if !stranded.is_empty() {
            warn!(count = stranded.len(), "failing queued commands; worker is gone");
        }
        for command in stranded {
            command.completion.resolve(Err(DispatchError::Closed));
        }

        self.events.emit(DispatchEvent::Closed);
        info!("worker output closed; dispatcher stopped");
    }
}
