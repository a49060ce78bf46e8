//! Structured logging setup
//!
//! The crate emits `tracing` events on its own: dimension casts and
//! migrations at `debug`/`trace`, broadcast shapes and reductions at `debug`.
//! Nothing is printed until the application installs a subscriber; with the
//! `subscriber` feature enabled, [`init_tracing`] does that.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directive (default `tenrso_named=info,warn`)
//! - `TENRSO_LOG_FORMAT`: `pretty`, `json` or `compact` (default `pretty`)
//!
//! # Example
//!
//! ```ignore
//! use tenrso_named::tracing_support::{init_tracing, TracingConfig, TracingFormat};
//!
//! init_tracing(TracingConfig {
//!     format: TracingFormat::Compact,
//!     filter: "tenrso_named=trace".to_string(),
//!     ..TracingConfig::default()
//! })?;
//! ```

use anyhow::Result;
#[cfg(feature = "subscriber")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// JSON format for structured logging
    Json,
    /// Single line per event
    Compact,
}

impl TracingFormat {
    /// Parse from string; anything unknown is `Pretty`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: TracingFormat,
    /// Filter directive (e.g. "tenrso_named=debug,info")
    pub filter: String,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_file: bool,
    pub with_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let format = std::env::var("TENRSO_LOG_FORMAT")
            .map(|s| TracingFormat::parse(&s))
            .unwrap_or(TracingFormat::Pretty);
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "tenrso_named=info,warn".to_string());

        Self {
            format,
            filter,
            with_ansi: true,
            with_target: true,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// Install a global subscriber. Call once at startup.
#[cfg(feature = "subscriber")]
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;

    match config.format {
        TracingFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        TracingFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(config.with_target)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        TracingFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
    }

    Ok(())
}

/// Stub for when the `subscriber` feature is disabled
#[cfg(not(feature = "subscriber"))]
pub fn init_tracing(_config: TracingConfig) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(TracingFormat::parse("json"), TracingFormat::Json);
        assert_eq!(TracingFormat::parse("COMPACT"), TracingFormat::Compact);
        assert_eq!(TracingFormat::parse("pretty"), TracingFormat::Pretty);
        assert_eq!(TracingFormat::parse("unknown"), TracingFormat::Pretty);
    }

    #[test]
    fn test_config_override() {
        let config = TracingConfig {
            format: TracingFormat::Json,
            filter: "tenrso_named=trace".to_string(),
            ..TracingConfig::default()
        };
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.filter, "tenrso_named=trace");
        assert!(config.with_target);
    }
}
