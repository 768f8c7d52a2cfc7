//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GREENMAP_*)
//! 2. TOML config file (if GREENMAP_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::naming;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GREENMAP_*)
/// 2. TOML config file (if GREENMAP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file holding every cache store.
    ///
    /// Set via GREENMAP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Fixed prefix of every cache store name.
    ///
    /// Set via GREENMAP_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag embedded in the current store name.
    ///
    /// Set via GREENMAP_CACHE_VERSION environment variable. Bump it on every
    /// shipped release so activation evicts the previous store.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin that manifest paths and relative request targets resolve against.
    ///
    /// Set via GREENMAP_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Bootstrap manifest: paths that must be cached once install succeeds.
    ///
    /// Set via GREENMAP_MANIFEST environment variable (`["/", "/index.html"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via GREENMAP_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via GREENMAP_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via GREENMAP_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./greenmap-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "greenmap".into()
}

fn default_cache_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/logo192.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "greenmap-worker/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            manifest: default_manifest(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the store owned by this version of the worker.
    pub fn store_name(&self) -> String {
        naming::store_name(&self.cache_prefix, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GREENMAP_`
    /// 2. TOML file from `GREENMAP_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GREENMAP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GREENMAP_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
