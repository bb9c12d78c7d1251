//! Spawning the worker process and wiring its pipes to the line channel.
//!
//! Only the minimum lifecycle lives here: start the program with piped
//! stdio, forward stderr to the log, and report when it exits. There is no
//! restart policy; when the worker dies the dispatcher closes.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{LineReader, LineWriter};

/// How to launch the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl WorkerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program and arguments as one display string.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A running worker with its stdin/stdout still attached.
pub struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl WorkerProcess {
    /// Start the worker. Its stderr is forwarded line by line to `tracing`
    /// at WARN, decoupled from the request/response flow.
    pub fn spawn(config: &WorkerConfig) -> Result<Self> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start worker '{}'", config.command_line()))?;
        let stdin = child.stdin.take().context("worker stdin unavailable")?;
        let stdout = child.stdout.take().context("worker stdout unavailable")?;
        let stderr = child.stderr.take().context("worker stderr unavailable")?;

        info!(worker = %config.command_line(), pid = child.id(), "worker started");
        forward_stderr(stderr);

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Split into the line channel halves and the child itself.
    pub fn into_parts(self) -> (LineWriter<ChildStdin>, LineReader<ChildStdout>, Child) {
        (
            LineWriter::new(self.stdin),
            LineReader::new(self.stdout),
            self.child,
        )
    }
}

fn forward_stderr(stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => warn!(target: "linegate::worker", stream = "stderr", "{line}"),
                Ok(None) => break,
                Err(error) => {
                    debug!(%error, "worker stderr unreadable");
                    break;
                }
            }
        }
    });
}

/// Wait for the worker to exit and log its status. Owns the child, so the
/// process is killed if this task is dropped with the runtime.
pub fn watch_exit(mut child: Child) -> JoinHandle<Option<ExitStatus>> {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                if status.success() {
                    info!(%status, "worker exited");
                } else {
                    warn!(%status, "worker exited");
                }
                Some(status)
            }
            Err(error) => {
                warn!(%error, "could not wait for worker");
                None
            }
        }
    })
}
