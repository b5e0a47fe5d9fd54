//! Subscriber setup for the `crossway` binary.
//!
//! `CROSSWAY_LOG` takes an `EnvFilter` directive and wins over the level from
//! the command line or `crossway.toml`.

use crossway_core::config::{LogConfig, LogFormat, LogLevel};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "CROSSWAY_LOG";

/// Effective logging options after merging config and flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogOptions {
    /// Flags override the configuration file
    #[must_use]
    pub fn merge(config: LogConfig, level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        Self {
            level: level.unwrap_or(config.level),
            format: format.unwrap_or(config.format),
        }
    }
}

/// Install the global subscriber once; later calls are no-ops
pub fn init(options: LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));

        match options.format {
            LogFormat::Json => {
                let subscriber = fmt::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
            LogFormat::Text => {
                let subscriber = fmt::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .with_ansi(use_ansi)
                    .with_target(true)
                    .with_level(true)
                    .compact()
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
        }
    });
}

/// clap value parser for `--log-level`
pub fn parse_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level '{}'", value))
}

/// clap value parser for `--log-format`
pub fn parse_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format '{}' (expected text or json)", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = LogConfig {
            level: LogLevel::Debug,
            format: LogFormat::Json,
        };
        let merged = LogOptions::merge(config, Some(LogLevel::Trace), None);
        assert_eq!(merged.level, LogLevel::Trace);
        assert_eq!(merged.format, LogFormat::Json, "config format is kept");
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_level("WARNING"), Ok(LogLevel::Warn));
        assert!(parse_level("loud").is_err());
        assert_eq!(parse_format("plain"), Ok(LogFormat::Text));
        assert!(parse_format("xml").unwrap_err().contains("xml"));
    }
}
