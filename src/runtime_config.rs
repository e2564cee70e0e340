//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for request dispatch.
//!
//! ## Environment Variables
//!
//! ### `TRELLIS_MAX_BODY_BYTES`
//!
//! Upper bound on how much of a request body is read. Bodies are read lazily,
//! the first time a handler asks for them; a larger body fails with `413`.
//!
//! Default: `2097152` (2 MiB)
//!
//! ### `TRELLIS_SLOW_MATCH_US`
//!
//! Route matches slower than this many microseconds are logged at `warn`.
//!
//! Default: `1000`
//!
//! ### `TRELLIS_CATCH_PANICS`
//!
//! When `true`, a panicking handler is reduced to a `500` response instead of
//! unwinding through the dispatcher.
//!
//! Default: `true`
//!
//! Invalid values fall back to the defaults.
//!
//! ## Usage
//!
//! ```rust
//! use trellis::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Body limit: {} bytes", config.max_body_bytes);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Request body cap in bytes (default: 2 MiB)
    pub max_body_bytes: usize,
    /// Slow route-match warning threshold (default: 1 ms)
    pub slow_match_threshold: Duration,
    /// Turn handler panics into 500 responses (default: true)
    pub catch_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            slow_match_threshold: Duration::from_micros(DEFAULT_SLOW_MATCH_US),
            catch_panics: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_body_bytes = lookup("TRELLIS_MAX_BODY_BYTES")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);
        let slow_match_us = lookup("TRELLIS_SLOW_MATCH_US")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_SLOW_MATCH_US);
        let catch_panics = lookup("TRELLIS_CATCH_PANICS")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        RuntimeConfig {
            max_body_bytes,
            slow_match_threshold: Duration::from_micros(slow_match_us),
            catch_panics,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
