//! Configuration management for boardwatch.
//!
//! Configuration is read once at startup from an optional TOML file, then
//! adjusted by environment variables. Every section has defaults, so an
//! empty or missing file is a valid configuration.

use crate::lookup::DEFAULT_LOOKUP_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Overrides `lookup.base_url`.
pub const ENV_LOOKUP_URL: &str = "BOARDWATCH_LOOKUP_URL";
/// Overrides `lookup.timeout_secs`.
pub const ENV_LOOKUP_TIMEOUT: &str = "BOARDWATCH_LOOKUP_TIMEOUT_SECS";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub signatures: SignaturesConfig,
}

/// Remote VID/PID identification service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LookupConfig {
    /// Endpoint; requests go to `<base_url>/<vid>/<pid>`
    #[serde(default = "default_lookup_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_lookup_url(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_lookup_url() -> String {
    DEFAULT_LOOKUP_URL.to_string()
}

fn default_lookup_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Enable the serial port backend
    #[serde(default = "default_true")]
    pub serial: bool,
    /// How often the serial backend rescans, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            serial: true,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListConfig {
    /// Grace period between starting discovery and taking the snapshot
    #[serde(default = "default_list_timeout")]
    pub timeout_ms: u64,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_list_timeout(),
        }
    }
}

fn default_list_timeout() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Capacity of the watch event channel. A slow consumer stalls
    /// identification once this many events are pending.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SignaturesConfig {
    /// JSON signature file; no local signatures when unset
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path` if given, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_LOOKUP_URL) {
            self.lookup.base_url = url;
        }
        if let Ok(secs) = std::env::var(ENV_LOOKUP_TIMEOUT) {
            self.lookup.timeout_secs = secs
                .parse()
                .with_context(|| format!("{ENV_LOOKUP_TIMEOUT} must be a number of seconds"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.watch.channel_capacity == 0 {
            anyhow::bail!("watch.channel_capacity must be at least 1");
        }
        if self.lookup.base_url.is_empty() {
            anyhow::bail!("lookup.base_url must not be empty");
        }
        Ok(())
    }
}
