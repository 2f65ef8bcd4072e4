//! Logging setup.
//!
//! Logs go to **stderr**: stdout carries the handshake line the host reads.
//!
//! - `RUST_LOG` filters events (default `info`), e.g.
//!   `RUST_LOG=terraform_provider_sendgrid=debug` logs every HTTP request.
//! - `SENDGRID_PROVIDER_LOG_FORMAT=json` switches to one JSON object per
//!   line; anything else, or unset, gives human-readable text.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable selecting the log format.
pub const ENV_LOG_FORMAT: &str = "SENDGRID_PROVIDER_LOG_FORMAT";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse a format name. Unknown names fall back to text.
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// The format selected by [`ENV_LOG_FORMAT`].
    pub fn from_env() -> Self {
        std::env::var(ENV_LOG_FORMAT)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

/// Install the global subscriber with the default `info` level and the
/// format from the environment. Does nothing if a subscriber is already set.
pub fn init_logging() {
    let _ = try_init_logging("info", LogFormat::from_env());
}

/// Like [`init_logging`] with a different default level.
pub fn init_logging_with_default(default_level: &str) {
    let _ = try_init_logging(default_level, LogFormat::from_env());
}

/// Install the global subscriber. `RUST_LOG` overrides `default_level`.
///
/// Fails if a global subscriber has already been set.
pub fn try_init_logging(default_level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let text = (format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
    });
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
}
