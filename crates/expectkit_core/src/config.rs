//! Configuration for expectkit test cases.

use crate::duration::{DEFAULT_TIMEOUT, SMALL, TINY};
use crate::error::{ExpectError, Result};
use crate::host::FailureMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File name looked up by [`Config::load`].
pub const CONFIG_FILE_NAME: &str = "expectkit.toml";

/// Comprehensive configuration for expectkit.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Timeout defaults.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Local host behavior.
    #[serde(default)]
    pub host: HostConfig,
}

impl Config {
    /// Load configuration from `expectkit.toml` under `root`.
    ///
    /// Returns the defaults if the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ExpectError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ExpectError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `expectkit.toml` under `root`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExpectError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| ExpectError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.timeouts.default_ms == 0 {
            return Err(ExpectError::ConfigError(
                "timeouts.default_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timeout defaults, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for waits that do not name one (default: 1000).
    pub default_ms: u64,

    /// Very short timeout (default: 1).
    pub tiny_ms: u64,

    /// Short timeout (default: 500).
    pub small_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            tiny_ms: TINY.as_millis() as u64,
            small_ms: SMALL.as_millis() as u64,
        }
    }
}

impl TimeoutConfig {
    /// Returns the default timeout as a Duration.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    /// Returns the tiny timeout as a Duration.
    pub fn tiny(&self) -> Duration {
        Duration::from_millis(self.tiny_ms)
    }

    /// Returns the small timeout as a Duration.
    pub fn small(&self) -> Duration {
        Duration::from_millis(self.small_ms)
    }
}

/// Local host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    /// How failures are signalled (default: record).
    pub failure_mode: FailureMode,

    /// Report fulfillments past the expected count (default: true).
    pub assert_for_overfulfill: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::Record,
            assert_for_overfulfill: true,
        }
    }
}
