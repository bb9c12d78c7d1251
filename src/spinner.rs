//! Terminal wait indicator for the console while a reply is outstanding.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

const FRAMES: &[&str] = &["|", "/", "-", "\\"];

const INTERVAL: Duration = Duration::from_millis(100);

/// Shows `message` plus elapsed seconds on stderr until stopped, so stdout
/// stays clean for replies.
pub struct Spinner {
    handle: JoinHandle<()>,
    cancel: tokio::sync::watch::Sender<bool>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(false);
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut tick = 0usize;
            loop {
                eprint!("{}", frame_text(tick, &message, started.elapsed()));
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = cancel_rx.changed() => break,
                }
                tick += 1;
            }
            // \x1b[2K clears the line
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            cancel: cancel_tx,
        }
    }

    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
    }
}

fn frame_text(tick: usize, message: &str, elapsed: Duration) -> String {
    let frame = FRAMES[tick % FRAMES.len()];
    format!("\x1b[2K\r{frame} {message} ({}s)", elapsed.as_secs())
}
