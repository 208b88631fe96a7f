//! Log output for embedding applications and tests.
//!
//! The engine only emits `tracing` events; it never installs a subscriber
//! on its own. Call [`init_tracing`] once at startup to get them on stderr:
//!
//! ```bash
//! OBJKIT_LOG=debug my-app                        # plain text
//! OBJKIT_LOG=objkit::coerce=warn my-app          # per-module filtering
//! OBJKIT_LOG=trace OBJKIT_LOG_FORMAT=json my-app # one JSON object per event
//! ```
//!
//! `OBJKIT_LOG` takes precedence over `RUST_LOG`. With neither set nothing
//! is installed.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Flat text lines (default).
    #[default]
    Text,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unrecognised is text.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("OBJKIT_LOG_FORMAT").unwrap_or_default())
    }
}

fn build_filter() -> EnvFilter {
    match std::env::var("OBJKIT_LOG") {
        Ok(directives) => EnvFilter::builder().parse_lossy(directives),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Install a global subscriber writing to stderr.
///
/// Returns `false` when no log variable is set or when another subscriber
/// is already installed.
pub fn init_tracing() -> bool {
    if std::env::var_os("OBJKIT_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
        return false;
    }

    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init().is_ok()
        }
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("tree"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }
}
