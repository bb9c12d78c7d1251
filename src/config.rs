//! Runtime configuration assembled from the command line.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};

use crate::consts::{DEFAULT_BIND, DEFAULT_REQUEST_TIMEOUT};
use crate::worker::WorkerConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub worker: WorkerConfig,
    /// HTTP listen address, `host:port`.
    pub bind: String,
    /// How long an HTTP caller waits for its reply. The dispatcher itself
    /// never times out.
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(worker: WorkerConfig) -> Self {
        Self {
            worker,
            bind: DEFAULT_BIND.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        // A zero deadline would time out every caller while their commands
        // still reach the worker.
        ensure!(
            !self.request_timeout.is_zero(),
            "invalid --timeout: must be at least one second"
        );
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid --bind '{}': expected host:port", self.bind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::new(WorkerConfig::new("worker"));
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn rejects_bad_bind() {
        let mut config = GatewayConfig::new(WorkerConfig::new("worker"));
        config.bind = "localhost".to_string();
        let error = config.bind_addr().unwrap_err().to_string();
        assert!(error.contains("invalid --bind 'localhost'"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = GatewayConfig::new(WorkerConfig::new("worker"));
        config.request_timeout = Duration::ZERO;
        let error = config.validate().unwrap_err().to_string();
        assert!(error.contains("invalid --timeout"));
    }

    #[test]
    fn validate_checks_bind_too() {
        let mut config = GatewayConfig::new(WorkerConfig::new("worker"));
        assert!(config.validate().is_ok());
        config.bind = "nowhere".to_string();
        assert!(config.validate().is_err());
    }
}
