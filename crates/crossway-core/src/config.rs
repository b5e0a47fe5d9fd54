//! Bridge configuration
//!
//! Loaded from a `crossway.toml`:
//!
//! ```toml
//! root_module = "Java"
//! top_level_packages = ["java", "javax", "com", "org"]
//! classpath = ["target/test-classes"]
//!
//! [stream]
//! autoclose = true
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a format name
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings, such as class load failures
    #[default]
    Warn,
    /// Informational
    Info,
    /// Cache misses and installations
    Debug,
    /// Cache hits
    Trace,
}

impl LogLevel {
    /// Parse a level name
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Matching `tracing` level
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

/// Logging section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// Stream conversion defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamDefaults {
    /// Whether closing a guest stream closes the foreign stream
    pub autoclose: bool,
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self { autoclose: true }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Guest name of the root namespace
    pub root_module: String,
    /// Packages reachable directly by their first segment
    pub top_level_packages: Vec<String>,
    /// Locations appended to the host classpath at startup
    pub classpath: Vec<PathBuf>,
    /// Stream conversion defaults
    pub stream: StreamDefaults,
    /// Logging
    pub logging: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_module: "Java".to_string(),
            top_level_packages: ["java", "javax", "com", "org"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            classpath: Vec::new(),
            stream: StreamDefaults::default(),
            logging: LogConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Relative classpath entries are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            for entry in &mut config.classpath {
                if entry.is_relative() {
                    *entry = base.join(&*entry);
                }
            }
        }
        Ok(config)
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root_module.chars().next().is_some_and(char::is_uppercase) {
            return Err(ConfigError::ValidationError(format!(
                "root_module '{}' must be a capitalised constant",
                self.root_module
            )));
        }
        if let Some(bad) = self
            .top_level_packages
            .iter()
            .find(|p| p.is_empty() || p.contains('.'))
        {
            return Err(ConfigError::ValidationError(format!(
                "top-level package '{}' must be a single segment",
                bad
            )));
        }
        Ok(())
    }

    /// Check whether `name` is a top-level package shortcut
    pub fn is_top_level(&self, name: &str) -> bool {
        self.top_level_packages.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.root_module, "Java");
        assert!(config.is_top_level("javax"));
        assert!(!config.is_top_level("net"));
        assert!(config.stream.autoclose);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml(
            r#"
            top_level_packages = ["java", "net"]

            [stream]
            autoclose = false

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.root_module, "Java");
        assert!(config.is_top_level("net"));
        assert!(!config.stream.autoclose);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level.as_tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            BridgeConfig::from_toml("root_module = \"java\""),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml("top_level_packages = [\"java.util\"]"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml("classpath = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file_resolves_classpath() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crossway.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "classpath = [\"target/test-classes\"]").unwrap();

        let config = BridgeConfig::from_file(&path).unwrap();
        assert_eq!(config.classpath, vec![dir.path().join("target/test-classes")]);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = BridgeConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(BridgeConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
