use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{CacheError, Result};
use crate::identity::{KeyHasher, IDENTITY_BASE};

/// Options that control key derivation and cache maintenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    /// Fold base for identity keys, must be odd (default: 761)
    #[serde(default = "default_identity_base")]
    pub identity_base: i32,

    /// Fold null targets as token 0 instead of skipping them (default: false)
    #[serde(default)]
    pub distinguish_null_targets: bool,

    /// Run a cleanup sweep every N ticks, 0 disables it (default: 0)
    #[serde(default)]
    pub cleanup_interval_ticks: u32,

    /// Pretty-print diagnostics (default: true)
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_identity_base() -> i32 {
    IDENTITY_BASE
}

fn default_true() -> bool {
    true
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            identity_base: IDENTITY_BASE,
            distinguish_null_targets: false,
            cleanup_interval_ticks: 0,
            pretty: true,
        }
    }
}

/// Main cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default)]
    pub cache_options: CacheOptions,

    /// Preview provider types that are never instantiated
    #[serde(default)]
    pub disabled_providers: Vec<String>,
}

impl CacheConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CacheConfig =
            serde_json::from_str(&content).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration and write it to a file
    pub fn init_file(path: &Path) -> Result<()> {
        let config = CacheConfig::default();
        let json =
            serde_json::to_string_pretty(&config).map_err(|e| CacheError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_options.identity_base % 2 == 0 {
            return Err(CacheError::Config(format!(
                "identityBase must be odd, got {}",
                self.cache_options.identity_base
            )));
        }
        Ok(())
    }

    pub fn key_hasher(&self) -> KeyHasher {
        KeyHasher::new(
            self.cache_options.identity_base,
            self.cache_options.distinguish_null_targets,
        )
    }
}
