use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use linegate::banner::{BannerInfo, print_banner, print_session_summary};
use linegate::config::GatewayConfig;
use linegate::console::Console;
use linegate::consts::{DEFAULT_BIND, DEFAULT_LOG_FILTER};
use linegate::decoder::JsonReplyDecoder;
use linegate::dispatcher::Dispatcher;
use linegate::server;
use linegate::worker::{WorkerConfig, WorkerProcess, watch_exit};

#[derive(Parser)]
#[command(
    name = "linegate",
    version,
    about = "Serialize concurrent requests onto a line-oriented worker process."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,

    /// Worker program to spawn
    #[arg(short, long, env = "LINEGATE_WORKER")]
    worker: PathBuf,

    /// Argument passed to the worker (repeatable, or comma-separated)
    #[arg(
        short = 'a',
        long = "worker-arg",
        env = "LINEGATE_WORKER_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    worker_args: Vec<String>,

    /// Working directory for the worker
    #[arg(long, env = "LINEGATE_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// HTTP listen address
    #[arg(short, long, env = "LINEGATE_BIND", default_value = DEFAULT_BIND)]
    bind: String,

    /// Seconds an HTTP caller waits for the worker's reply
    #[arg(
        short,
        long,
        env = "LINEGATE_TIMEOUT",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "LINEGATE_LOG", default_value = DEFAULT_LOG_FILTER)]
    log: String,

    /// Skip the startup banner
    #[arg(long, env = "LINEGATE_NO_BANNER")]
    no_banner: bool,
}

#[derive(Subcommand, Clone, Copy, PartialEq)]
enum Mode {
    /// Serve the HTTP API (default)
    Serve,
    /// Type commands at the worker interactively
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let mode = cli.command.unwrap_or(Mode::Serve);
    let mut config = GatewayConfig::new(WorkerConfig {
        program: cli.worker,
        args: cli.worker_args,
        working_dir: cli.work_dir,
    });
    config.bind = cli.bind;
    config.request_timeout = Duration::from_secs(cli.timeout);
    config.validate()?;

    let process = WorkerProcess::spawn(&config.worker)?;
    let pid = process.id();
    let (writer, reader, child) = process.into_parts();
    let _exit = watch_exit(child);
    let (dispatcher, _task) = Dispatcher::spawn(
        Box::new(writer),
        Box::new(reader),
        Box::new(JsonReplyDecoder),
    );

    let worker_label = config.worker.command_line();
    if !cli.no_banner {
        print_banner(&BannerInfo {
            mode: if mode == Mode::Console { "console" } else { "serve" },
            worker: &worker_label,
            pid,
            bind: (mode == Mode::Serve).then_some(config.bind.as_str()),
            timeout: config.request_timeout,
        });
    }

    match mode {
        Mode::Serve => server::serve(&config, dispatcher).await?,
        Mode::Console => {
            let interactive = std::io::stdin().is_terminal();
            let console = Console::new(&dispatcher, &worker_label, interactive);
            let stats = console
                .run(BufReader::new(tokio::io::stdin()))
                .await?;
            print_session_summary(stats.sent, stats.failed);
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(
            std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_filter.to_string()),
        );

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Cli::try_parse_from(["linegate", "-w", "worker", "--timeout", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn worker_args_repeat_or_split_on_commas() {
        let cli = Cli::try_parse_from([
            "linegate", "-w", "worker", "-a", "--api", "-a", "a,b", "console",
        ])
        .unwrap();
        assert_eq!(cli.worker_args, ["--api", "a", "b"]);
        assert!(cli.command == Some(Mode::Console));
        assert_eq!(cli.timeout, 30);
        assert!(!cli.no_banner);
    }
}
