//! Bootstrap configuration loading
//!
//! The kiosk controller reads a single TOML file at startup. Resolution
//! priority for the file location:
//! 1. Command-line argument (highest priority)
//! 2. `KIOSK_CONFIG` environment variable
//! 3. User config directory (`~/.config/kiosk/kiosk-ui.toml`)
//! 4. System config (`/etc/kiosk/kiosk-ui.toml`, Linux only)
//! 5. Compiled defaults (fallback)
//!
//! A missing file is not fatal: a warning is logged and compiled defaults
//! are used. A file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KIOSK_CONFIG";

/// File name looked up in the config directories
pub const CONFIG_FILE_NAME: &str = "kiosk-ui.toml";

/// Default HTTP port of the kiosk controller
pub const DEFAULT_PORT: u16 = 5750;

/// Upper bound for the completion poll interval
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// How the availability filter treats ingredient lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityMode {
    /// Garnishes and non-"ml" lines never block a cocktail
    #[default]
    Permissive,
    /// Only garnishes are exempt; every other line must be loaded
    Strict,
}

/// What to do when a cocktail references an unknown ingredient name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Refuse the catalog write
    #[default]
    Reject,
    /// Log a warning and accept the write
    Warn,
}

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The controller must restart
/// to pick up changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface the controller HTTP server binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the store server (catalog, configuration, hardware calls)
    #[serde(default = "default_store_url")]
    pub store_url: String,

    /// Per-request timeout for store calls
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Dispense polling settings
    #[serde(default)]
    pub dispense: DispenseConfig,

    /// Catalog and availability settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseConfig {
    /// Delay between two completion checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum time to wait for completion before reporting a timeout
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

/// Catalog behaviour configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub availability_mode: AvailabilityMode,

    #[serde(default)]
    pub integrity_policy: IntegrityPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_store_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_wait_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_port(),
            store_url: default_store_url(),
            request_timeout_ms: default_request_timeout_ms(),
            dispense: DispenseConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DispenseConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DispenseConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration following the resolution priority
    ///
    /// Returns the configuration and the file it came from (None when
    /// compiled defaults were used).
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok((Self::default(), None))
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.store_url.starts_with("http://") || self.store_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "store_url must be an http(s) URL, got '{}'",
                self.store_url
            )));
        }
        if self.dispense.poll_interval_ms == 0 || self.dispense.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(Error::Config(format!(
                "dispense.poll_interval_ms must be within 1..={}",
                MAX_POLL_INTERVAL_MS
            )));
        }
        if self.dispense.max_wait_secs == 0 {
            return Err(Error::Config("dispense.max_wait_secs must be positive".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Resolve the config file location
///
/// Explicit locations (CLI, environment) are returned even when the file does
/// not exist so the caller can warn about them; directory lookups only return
/// existing files.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("kiosk").join(CONFIG_FILE_NAME)) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System config
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/kiosk").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
