//! Structured logging setup.
//!
//! Every routing and dispatch decision is reported through `tracing`. This
//! module installs the subscriber that turns those events into output:
//! JSON lines for production, pretty-printed events for development.
//!
//! ## Environment Variables
//!
//! | Variable              | Default | Meaning                                     |
//! |-----------------------|---------|---------------------------------------------|
//! | `TRELLIS_LOG_LEVEL`   | `info`  | Base level: trace/debug/info/warn/error     |
//! | `TRELLIS_LOG_FORMAT`  | `json`  | `json` or `pretty`                          |
//! | `TRELLIS_LOG_TARGETS` | unset   | Extra `EnvFilter` directives, comma-separated |
//!
//! ```no_run
//! use trellis::logging::{self, LogConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! logging::init(&LogConfig::from_env())?;
//! # Ok(())
//! # }
//! ```

use std::env;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives such as `trellis::router=debug`.
    pub targets: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            targets: None,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("TRELLIS_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("TRELLIS_LOG_FORMAT")
                .map_or(defaults.format, |f| LogFormat::parse(&f)),
            targets: lookup("TRELLIS_LOG_TARGETS").filter(|t| !t.trim().is_empty()),
        }
    }

    /// Level followed by the extra target directives.
    #[must_use]
    pub fn directives(&self) -> String {
        match &self.targets {
            Some(targets) => format!("{},{}", self.log_level, targets),
            None => self.log_level.clone(),
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails when the filter directives do not parse or a global subscriber is
/// already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .with_context(|| format!("Invalid log filter '{}'", config.directives()))?;

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    installed.map_err(|err| anyhow!("Failed to initialize logging: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    }

    #[test]
    fn test_log_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TRELLIS_LOG_LEVEL", "debug"),
            ("TRELLIS_LOG_FORMAT", "pretty"),
            ("TRELLIS_LOG_TARGETS", "trellis::router=trace"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.directives(), "debug,trellis::router=trace");
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::from_lookup(|_| None);
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.directives(), "info");
    }
}
