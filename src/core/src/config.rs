use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RenameError;

/// Top-level configuration for a rename run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenamerConfig {
    /// Registry transport and credentials
    pub registry: RegistryConfig,

    /// Log level
    pub log_level: LogLevel,
}

/// Registry configuration.
///
/// Passed explicitly into the registry client; nothing here is read from
/// process-global state after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registries reached over plain HTTP (e.g. "localhost:5000")
    pub insecure_registries: Vec<String>,

    /// Docker `config.json` to read credentials from (None = environment or anonymous)
    pub docker_config: Option<PathBuf>,

    /// OS selected when resolving a multi-platform image index
    pub platform_os: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            insecure_registries: Vec::new(),
            docker_config: None,
            platform_os: "linux".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Whether the given registry host should be contacted over HTTP.
    pub fn is_insecure(&self, registry: &str) -> bool {
        self.insecure_registries
            .iter()
            .any(|r| r.eq_ignore_ascii_case(registry))
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, usable as a tracing filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = RenameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(RenameError::ConfigError(format!(
                "Unknown log level '{}'",
                other
            ))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
