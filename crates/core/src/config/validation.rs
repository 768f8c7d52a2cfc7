//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` is empty or contains whitespace
    /// - `cache_version` is empty
    /// - `origin` is not an http(s) URL
    /// - a `manifest` entry is not an absolute path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "cache_prefix".into(),
                reason: "must be non-empty and contain no whitespace".into(),
            });
        }

        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if let Some(bad) = self.manifest.iter().find(|path| !path.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "manifest".into(),
                reason: format!("entry {bad:?} must start with '/'"),
            });
        }

        let unique: HashSet<&str> = self.manifest.iter().map(String::as_str).collect();
        if unique.len() != self.manifest.len() {
            tracing::warn!(
                entries = self.manifest.len(),
                unique = unique.len(),
                "manifest contains duplicate paths; each is cached once"
            );
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
