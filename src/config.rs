//! Configuration management module
//!
//! Everything is optional: a missing file or section falls back to the defaults below.

use std::time::Duration;

use node_locator::ResolveOptions;
use serde::{Deserialize, Serialize};
use site_adapters::{ProfileConfig, BUILTIN_SITES};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub detector: DetectorConfig,
    pub resolver: ResolveOptions,
    pub adapters: AdaptersConfig,
    /// Extra environments described in configuration.
    pub profiles: Vec<ProfileConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub cache_ttl_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
        }
    }
}

impl DetectorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptersConfig {
    /// Built-in adapters to register, by id.
    pub enabled: Vec<String>,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            enabled: BUILTIN_SITES.iter().map(|id| id.to_string()).collect(),
        }
    }
}
