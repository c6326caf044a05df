//! Application configuration management.
//!
//! Configuration covers where the local store lives and how the cache
//! behaves. It is stored at `~/.config/hydrobill/config.json`; a missing file
//! means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, DEFAULT_TTL};
use crate::store::DEFAULT_DB_PATH;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "hydrobill";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default period for purging expired cache entries.
const DEFAULT_SWEEP_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_max_entries: Option<usize>,
    pub cache_sweep_secs: Option<u64>,
    /// Mirror cache entries to disk so they survive a restart.
    pub persist_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            cache_ttl_secs: None,
            cache_max_entries: None,
            cache_sweep_secs: None,
            persist_cache: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::default()
            .with_default_ttl(
                self.cache_ttl_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_TTL),
            )
            .with_sweep_interval(Duration::from_secs(
                self.cache_sweep_secs.unwrap_or(DEFAULT_SWEEP_SECS),
            ))
            .with_mirror_purge(self.persist_cache);
        if let Some(max) = self.cache_max_entries {
            config = config.with_max_entries(max);
        }
        config
    }
}
