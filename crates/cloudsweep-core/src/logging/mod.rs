//! Structured logging setup.
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Install the global tracing subscriber.
///
/// `quiet` lowers the default level to `warn`; `RUST_LOG` always wins when set.
/// `json` switches to one JSON object per line.
pub fn init_logging(quiet: bool, json: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (tests, embedding) must not panic.
    let _ = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.compact().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(true, false);
        init_logging(false, true);
    }
}
