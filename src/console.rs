//! Interactive console: type worker commands, see their replies.

use std::io::{self, Write};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{CommandRegistry, CommandResult, ConsoleContext};
use crate::dispatcher::DispatcherHandle;
use crate::spinner::Spinner;

/// Counts for the goodbye line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub failed: u64,
}

impl SessionStats {
    fn record(&mut self, ok: bool) {
        self.sent += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

pub struct Console<'a> {
    dispatcher: &'a DispatcherHandle,
    worker: &'a str,
    registry: CommandRegistry,
    /// Draw the wait spinner; off when input is not a terminal.
    interactive: bool,
}

impl<'a> Console<'a> {
    pub fn new(dispatcher: &'a DispatcherHandle, worker: &'a str, interactive: bool) -> Self {
        Self {
            dispatcher,
            worker,
            registry: CommandRegistry::new(),
            interactive,
        }
    }

    /// Read lines until EOF, `/quit` or Ctrl+C.
    pub async fn run<R>(&self, input: R) -> Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut stats = SessionStats::default();
        let ctx = ConsoleContext {
            dispatcher: self.dispatcher,
            worker: self.worker,
        };

        loop {
            if self.interactive {
                print!("\nlinegate> ");
                io::stdout().flush()?;
            }

            let line = tokio::select! {
                result = lines.next_line() => match result {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("input error: {e}");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match self.registry.dispatch(input, &ctx).await {
                CommandResult::Quit => break,
                CommandResult::Handled => {}
                CommandResult::Sent { ok } => stats.record(ok),
                CommandResult::NotACommand => {
                    let ok = self.send(input).await;
                    stats.record(ok);
                }
            }
        }

        Ok(stats)
    }

    async fn send(&self, command: &str) -> bool {
        let spinner = self
            .interactive
            .then(|| Spinner::start("waiting for worker"));
        let result = self.dispatcher.submit(command, true).await;
        if let Some(spinner) = spinner {
            spinner.stop().await;
        }

        match result {
            Ok(reply) => {
                println!("=> {}", serde_json::to_string(&reply).unwrap_or_default());
                true
            }
            Err(error) => {
                eprintln!("error: {error}");
                false
            }
        }
    }
}
