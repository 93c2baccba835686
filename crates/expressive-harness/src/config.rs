//! Harness configuration via environment variables
//!
//! Command-line flags take precedence; these only switch features on.

use std::env;

/// Filter used when neither `EXPRESSIVE_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Disable colored output (EXPRESSIVE_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Print a JSON summary instead of the text report (EXPRESSIVE_JSON=1)
    pub json: bool,
    /// Tracing filter directive (EXPRESSIVE_LOG, then RUST_LOG)
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var("EXPRESSIVE_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            json: env::var("EXPRESSIVE_JSON")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            log_filter: env::var("EXPRESSIVE_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn is_truthy(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    !(lower.is_empty() || lower == "0" || lower == "false" || lower == "off")
}
