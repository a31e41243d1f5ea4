//! Configuration for the dashboard binary
//!
//! A small TOML file controls where the record collections live and how
//! aggressive the memoization cache is. Every field has a default, so
//! running without a config file works.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the JSON record collections
    pub data_dir: PathBuf,
    /// Seconds a memoized derivation stays fresh
    pub cache_ttl_secs: u64,
    /// Resident cache entry ceiling
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Read configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
