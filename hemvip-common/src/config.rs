//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument or environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::{Error, Result};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Default number of claim attempts before assignment reports a conflict
pub const DEFAULT_CLAIM_ATTEMPTS: u32 = 3;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub db_path: PathBuf,
    /// Origins echoed back in `Access-Control-Allow-Origin`
    pub allowed_origins: Vec<String>,
    /// Select-then-claim rounds before an assignment gives up
    pub claim_attempts: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: default_db_path(),
            allowed_origins: Vec::new(),
            claim_attempts: DEFAULT_CLAIM_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Merge overrides over the config file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: Option<FileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Config::default();

        let config = Config {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            db_path: overrides
                .db_path
                .or(file.db_path)
                .unwrap_or(defaults.db_path),
            allowed_origins: overrides
                .allowed_origins
                .or(file.allowed_origins)
                .unwrap_or(defaults.allowed_origins),
            claim_attempts: overrides
                .claim_attempts
                .or(file.claim_attempts)
                .unwrap_or(defaults.claim_attempts),
            request_timeout_secs: overrides
                .request_timeout_secs
                .or(file.request_timeout_secs)
                .unwrap_or(defaults.request_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.claim_attempts == 0 {
            return Err(Error::Config(
                "claim_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.allowed_origins.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::Config(
                "allowed_origins must not contain empty entries".to_string(),
            ));
        }
        if self.allowed_origins.iter().any(|o| o.trim() == "*") {
            return Err(Error::Config(
                "allowed_origins must list explicit origins; \"*\" cannot be combined with credentials".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values supplied on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub db_path: Option<PathBuf>,
    pub allowed_origins: Option<Vec<String>>,
    pub claim_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub db_path: Option<PathBuf>,
    pub allowed_origins: Option<Vec<String>>,
    pub claim_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }
}

/// Load the config file
///
/// An explicitly named file must exist. Without one, the platform default
/// location is tried and silently skipped when absent.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using defaults");
                return Ok(None);
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let file = FileConfig::from_toml(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(Some(file))
}

/// ~/.config/hemvip/config.toml (platform equivalent elsewhere)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hemvip").join("config.toml"))
}

/// OS-dependent default database location
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hemvip"))
        .unwrap_or_else(|| PathBuf::from("./hemvip_data"))
        .join("hemvip.db")
}
