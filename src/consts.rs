//! Project-wide constants.

use std::time::Duration;

/// Default HTTP listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default time an HTTP caller waits for the worker before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Command the worker answers with a full state snapshot.
pub const STATE_COMMAND: &str = "GET_STATE";

/// Render a duration as whole seconds, or milliseconds below one second.
pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}s", duration.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        assert!(DEFAULT_BIND.parse::<std::net::SocketAddr>().is_ok());
        assert!(!DEFAULT_REQUEST_TIMEOUT.is_zero());
        assert!(!STATE_COMMAND.contains('\n'));
    }

    #[test]
    fn format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s");
    }

    #[test]
    fn format_duration_sub_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }
}
