//! Configuration management for Birdsight
//!
//! This module provides layered configuration: built-in defaults, an optional
//! TOML file (generated with comments on first run), then environment
//! overrides. Each TOML section converts into the runtime config of the
//! component it drives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, MediaConfig, RetryPolicy, UsageConfig};
use crate::constants::{self, endpoints, history, http, limits, media, storage, usage};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Backend HTTP client settings
    pub client: ClientConfigToml,
    /// Media cache and retry settings
    pub media: MediaConfigToml,
    /// Usage gating settings
    pub usage: UsageConfigToml,
    /// Local history settings
    pub history: HistoryConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Backend base URL
    pub base_url: String,
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Identification stream timeout in seconds, body included
    pub stream_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            base_url: endpoints::DEFAULT_BASE_URL.to_string(),
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            stream_timeout_secs: http::STREAM_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfigToml {
    /// Cache entry lifetime in seconds
    pub ttl_secs: u64,
    /// Retries after the first failed lookup
    pub max_retries: u32,
    /// First retry delay in milliseconds, doubled per retry
    pub base_delay_ms: u64,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for MediaConfigToml {
    fn default() -> Self {
        Self {
            ttl_secs: media::CACHE_TTL.as_secs(),
            max_retries: media::MAX_RETRIES,
            base_delay_ms: media::RETRY_BASE_DELAY_MS,
            timeout_ms: media::ATTEMPT_TIMEOUT_MS,
        }
    }
}

/// TOML-friendly usage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfigToml {
    /// Identifications allowed before gating
    pub limit: u32,
    /// Never gate this identity
    pub privileged: bool,
}

impl Default for UsageConfigToml {
    fn default() -> Self {
        Self {
            limit: usage::DEFAULT_LIMIT,
            privileged: false,
        }
    }
}

/// TOML-friendly history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfigToml {
    /// Maximum retained entries
    pub max_entries: usize,
    /// Key-value store file (None = platform data directory)
    pub store_path: Option<PathBuf>,
}

impl Default for HistoryConfigToml {
    fn default() -> Self {
        Self {
            max_entries: history::MAX_ENTRIES,
            store_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: constants::logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: true,
        }
    }
}

impl LoggingConfig {
    /// Parsed `level`, case-insensitive
    pub fn level(&self) -> std::result::Result<tracing::Level, ConfigError> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            })
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match config_file_override {
            Some(ref path) => Some(path.clone()),
            None => Self::find_config_file(),
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(constants::env::BASE_URL) {
            if !base_url.trim().is_empty() {
                debug!("Base URL overridden from environment");
                self.client.base_url = base_url;
            }
        }
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Rate limit must be at least 1".to_string(),
            });
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history.max_entries".to_string(),
                value: "0".to_string(),
                reason: "History must keep at least one entry".to_string(),
            });
        }
        if self.media.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "media.timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "Attempt timeout must be positive".to_string(),
            });
        }
        if self.client.stream_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.stream_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Stream timeout must be positive".to_string(),
            });
        }
        self.logging.level()?;
        Ok(())
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file if none exists and notifies the user
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::get_default_config_path()?;

        if config_path.exists() {
            return Ok(Some(config_path));
        }

        info!("Creating default configuration file...");

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        println!("📁 Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   You can customize settings by editing this file.");
        println!();

        Ok(Some(config_path))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!(
            "./{}",
            constants::config::LOCAL_FILE_NAME
        ))];
        if let Ok(user_path) = Self::get_default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir
            .join(storage::APP_DIR_NAME)
            .join(constants::config::USER_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Birdsight Configuration
# This file was automatically generated on first run.
# You can customize any of these settings to suit your needs.

[client]
# Backend base URL (BIRDSIGHT_BASE_URL overrides this)
base_url = "{}"
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {}
pool_max_per_host = {}
request_timeout_secs = {}
# Identification stream timeout in seconds, covering the whole streamed body
stream_timeout_secs = {}
connect_timeout_secs = {}
rate_limit_rps = {}

[media]
# Cache lifetime for media lookups, in seconds
ttl_secs = {}
# Retries after the first failed lookup
max_retries = {}
# First retry delay in milliseconds, doubled for each retry
base_delay_ms = {}
# Timeout for a single lookup attempt in milliseconds
timeout_ms = {}

[usage]
# Identifications allowed before gating
limit = {}
privileged = false

[history]
max_entries = {}
# store_path = "/path/to/store.json"  # Uncomment to override the data directory

[logging]
# Used when no -v/--very-verbose/-q flag is given
level = "{}"  # error, warn, info, debug, trace
colored_output = true
"#,
            endpoints::DEFAULT_BASE_URL,
            http::POOL_IDLE_TIMEOUT.as_secs(),
            http::POOL_MAX_PER_HOST,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::STREAM_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            limits::DEFAULT_RATE_LIMIT_RPS,
            media::CACHE_TTL.as_secs(),
            media::MAX_RETRIES,
            media::RETRY_BASE_DELAY_MS,
            media::ATTEMPT_TIMEOUT_MS,
            usage::DEFAULT_LIMIT,
            history::MAX_ENTRIES,
            constants::logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

impl MediaConfigToml {
    /// Convert to runtime MediaConfig
    pub fn to_runtime_config(&self) -> MediaConfig {
        MediaConfig {
            cache_ttl: Duration::from_secs(self.ttl_secs),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.base_delay_ms),
                attempt_timeout: Duration::from_millis(self.timeout_ms),
            },
        }
    }
}

impl UsageConfigToml {
    /// Convert to runtime UsageConfig
    pub fn to_runtime_config(&self) -> UsageConfig {
        UsageConfig {
            limit: self.limit,
            privileged: self.privileged,
        }
    }
}
