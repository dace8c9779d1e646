//! Configuration management for the fgadmin services.
//!
//! Sources, lowest precedence first:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Example
//!
//! ```ignore
//! use fgadmin_server::config::ServerConfig;
//!
//! let config = ServerConfig::load("fgadmin.yaml")?;
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use fgadmin_domain::PoolConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix: `FGADMIN_POOL__WORKERS` overrides `pool.workers`.
pub const ENV_PREFIX: &str = "FGADMIN";

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Worker pool settings
    #[serde(default)]
    pub pool: PoolSettings,

    /// Tuple store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Worker pool settings.
///
/// Environment variables:
///
/// - `FGADMIN_POOL__WORKERS=8`
/// - `FGADMIN_POOL__QUEUE_CAPACITY=32`
/// - `FGADMIN_POOL__SUBMIT_TIMEOUT_MS=250`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PoolSettings {
    /// Number of workers, fixed for the life of the process.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs that may wait for a worker before submission blocks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long submission may block on a full queue. 0 waits indefinitely.
    #[serde(default)]
    pub submit_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            submit_timeout_ms: 0,
        }
    }
}

fn default_workers() -> usize {
    50
}

fn default_queue_capacity() -> usize {
    100
}

/// Tuple store settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreSettings {
    /// Store backend. Only "memory" is built in.
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Tuples per page for paginated reads.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            page_size: default_page_size(),
        }
    }
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_page_size() -> usize {
    fgadmin_storage::memory::DEFAULT_PAGE_SIZE
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,

    /// Log when instrumented operations start and finish, with timings.
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Loads configuration from a YAML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Loads defaults with environment overrides only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(environment())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.pool.workers == 0 {
            return Err(invalid("pool.workers must be greater than 0"));
        }
        if self.pool.queue_capacity == 0 {
            return Err(invalid("pool.queue_capacity must be greater than 0"));
        }
        if self.store.page_size == 0 {
            return Err(invalid("store.page_size must be greater than 0"));
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "store.backend must be one of: {:?}, got: {}",
                    valid_backends, self.store.backend
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Worker pool configuration derived from the `pool` section.
    pub fn pool_config(&self) -> PoolConfig {
        let config = PoolConfig::default()
            .with_workers(self.pool.workers)
            .with_queue_capacity(self.pool.queue_capacity);
        match self.pool.submit_timeout_ms {
            0 => config,
            ms => config.with_submit_timeout(Duration::from_millis(ms)),
        }
    }
}

fn environment() -> Environment {
    // FGADMIN_POOL__WORKERS -> pool.workers
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: &str) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.to_string(),
    }
}
