//! Configuration for response caching.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration for one response cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether responses are cached at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds a cached response stays valid (default: 15).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    15
}

/// Errors that can occur during cache configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Invalid time-to-live (must be > 0 when caching is enabled).
    #[error("Invalid cache TTL: must be greater than 0")]
    InvalidTtl,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), ttl_secs: default_ttl_secs() }
    }
}

impl CacheConfig {
    /// Creates an enabled configuration with the given time-to-live.
    #[must_use]
    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self { enabled: true, ttl_secs }
    }

    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.enabled && self.ttl_secs == 0 {
            return Err(CacheConfigError::InvalidTtl);
        }
        Ok(())
    }

    /// Get the time-to-live as a Duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
