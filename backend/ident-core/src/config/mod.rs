use crate::error::config::ConfigError;
use crate::protocol::DEFAULT_IDENT_PORT;
use crate::{IDENT_PORT_ENV, IDENT_TIMEOUT_SECS_ENV};

use common::ErrorLocation;

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "ident.toml";
const CONFIG_DIR_NAME: &str = "identcheck";
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// The two tunables of an ident client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentConfig {
    /// Remote port the ident service listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Default per-query timeout, overridable per call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IdentConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_IDENT_PORT
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// `{config_dir}/identcheck`, where the CLI looks for `ident.toml` by default.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

impl IdentConfig {
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load `{config_dir}/ident.toml`.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let config = Self::load_from_path(&config_path)?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {}", path.display(), e);
            ConfigError::ReadError {
                location: ErrorLocation::here(),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config: IdentConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML {}: {}", path.display(), e);
            ConfigError::ParseError {
                location: ErrorLocation::here(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Apply `IDENT_PORT` / `IDENT_TIMEOUT_SECS` from `lookup`, then re-validate.
    ///
    /// `lookup` is normally `std::env::var`; the CLI passes it after loading `.env`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(IDENT_PORT_ENV) {
            self.port = value.trim().parse().map_err(|_| ConfigError::ValidationError {
                location: ErrorLocation::here(),
                reason: format!("{IDENT_PORT_ENV} is not a port number: {value}"),
            })?;
            debug!("Ident port overridden to {}", self.port);
        }

        if let Some(value) = lookup(IDENT_TIMEOUT_SECS_ENV) {
            self.timeout_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::ValidationError {
                        location: ErrorLocation::here(),
                        reason: format!("{IDENT_TIMEOUT_SECS_ENV} is not a number: {value}"),
                    })?;
            debug!("Ident timeout overridden to {}s", self.timeout_secs);
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for port 0 or a timeout outside 1-300s.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::here(),
                reason: String::from("Ident port cannot be 0"),
            });
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::here(),
                reason: format!(
                    "Invalid timeout: {}s (must be 1-{MAX_TIMEOUT_SECS})",
                    self.timeout_secs
                ),
            });
        }

        Ok(())
    }
}
