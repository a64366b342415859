//! Configuration management for cloudgdpr
//!
//! This module handles loading, parsing, and validating configuration from:
//! - Configuration file (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the CLI)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::model::{ContainerDeclaration, ContainerId, ContainerNameMapping};
use crate::store::mongo::DEFAULT_RECORD_TYPE_FIELD;
use crate::transform::NamingStrategy;

/// Environment variable overriding `connection.uri`
pub const URI_ENV: &str = "CLOUDGDPR_URI";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Record store layout
    #[serde(default)]
    pub store: StoreConfig,

    /// Export output configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Containers holding personal data
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Connect and server selection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// How records are laid out in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Document field holding the record type
    #[serde(default = "default_record_type_field")]
    pub record_type_field: String,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Export output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Artifact format
    #[serde(default)]
    pub format: ExportFormat,

    /// Directory artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Naming of containers without a display name
    #[serde(default)]
    pub naming: NamingStrategy,
}

/// Export artifact formats
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON array per container and record type
    #[default]
    Json,
    /// One CSV file per container and record type
    Csv,
    /// The aggregated records as a single JSON document
    Raw,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// One declared container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Container identifier
    pub id: String,

    /// Display name used to name export artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Record types holding personal data
    #[serde(default)]
    pub record_types: Vec<String>,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_app_name() -> String {
    "cloudgdpr".to_string()
}

fn default_record_type_field() -> String {
    DEFAULT_RECORD_TYPE_FIELD.to_string()
}

fn default_page_size() -> usize {
    crate::engine::DEFAULT_PAGE_LIMIT
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            timeout: default_timeout(),
            app_name: default_app_name(),
        }
    }
}

impl ConnectionConfig {
    /// Connect and server selection timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            record_type_field: default_record_type_field(),
            page_size: default_page_size(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            output_dir: default_output_dir(),
            naming: NamingStrategy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `~/.cloudgdpr/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cloudgdpr")
            .join("config.toml")
    }

    /// Load configuration from a file
    ///
    /// Without an explicit path the default location is tried, and a missing
    /// default file yields the default configuration. A missing explicit file
    /// is an error.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file path
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Serialize configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.override_uri(std::env::var(URI_ENV).ok());
    }

    fn override_uri(&mut self, uri: Option<String>) {
        if let Some(uri) = uri.filter(|uri| !uri.trim().is_empty()) {
            self.connection.uri = uri;
        }
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.connection.uri.trim().is_empty() {
            return Err(ConfigError::MissingField("connection.uri".to_string()).into());
        }

        if self.store.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.page_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.store.record_type_field.trim().is_empty() {
            return Err(ConfigError::MissingField("store.record_type_field".to_string()).into());
        }

        let mut seen = BTreeSet::new();
        for container in &self.containers {
            if container.id.trim().is_empty() {
                return Err(ConfigError::MissingField("containers.id".to_string()).into());
            }
            if !seen.insert(container.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "containers.id".to_string(),
                    value: format!("{} (duplicate)", container.id),
                }
                .into());
            }
            if container.record_types.is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "containers.record_types of '{}'",
                    container.id
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Declared containers and their record types
    pub fn declaration(&self) -> ContainerDeclaration {
        self.containers
            .iter()
            .map(|c| {
                (
                    ContainerId::new(c.id.clone()),
                    c.record_types.iter().cloned().collect(),
                )
            })
            .collect()
    }

    /// Display names of the containers that have one
    pub fn name_mapping(&self) -> ContainerNameMapping {
        self.containers
            .iter()
            .filter_map(|c| {
                c.name
                    .as_ref()
                    .map(|name| (ContainerId::new(c.id.clone()), name.clone()))
            })
            .collect()
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "raw" => Ok(ExportFormat::Raw),
            other => Err(ConfigError::InvalidValue {
                field: "export.format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
