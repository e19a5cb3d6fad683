//! ResponseCache implementation with expiry on lookup.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use super::config::{CacheConfig, CacheConfigError};
use super::types::{CacheKey, CacheStats, CachedResponse};

/// Response cache for one collaborator endpoint.
///
/// Only successful responses are inserted. An entry is served until its
/// time-to-live has elapsed; the first lookup after that drops it.
#[derive(Debug)]
pub struct ResponseCache<V> {
    /// The cache storage (fingerprint -> cached response).
    entries: RwLock<HashMap<CacheKey, CachedResponse<V>>>,
    /// Whether lookups and inserts are active.
    enabled: bool,
    /// How long an entry stays valid.
    ttl: Duration,
    /// Cache statistics.
    stats: RwLock<CacheStats>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a new response cache from configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if the configuration is invalid.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheConfigError> {
        config.validate()?;
        Ok(Self::build(config.enabled, config.ttl()))
    }

    /// Create an enabled cache with the given time-to-live.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::build(true, ttl)
    }

    /// Create a cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::build(false, Duration::ZERO)
    }

    fn build(enabled: bool, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            enabled,
            ttl,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Look up a fresh entry, dropping it if its window has passed.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(self.ttl),
            None => {
                self.record(|stats| stats.total_misses += 1);
                debug!(key = %key.as_str(), "Cache miss");
                return None;
            }
        };

        if expired {
            entries.remove(key);
            let size = entries.len();
            self.record(|stats| {
                stats.total_misses += 1;
                stats.total_expirations += 1;
                stats.cache_size = size;
            });
            debug!(key = %key.as_str(), "Cache entry expired");
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.touch();
        self.record(|stats| stats.total_hits += 1);
        debug!(key = %key.as_str(), access_count = entry.access_count, "Cache hit");
        Some(entry.value.clone())
    }

    /// Store a response under `key`, replacing any previous entry.
    ///
    /// Expired entries under other keys are swept first.
    pub fn insert(&self, key: CacheKey, value: V) {
        if !self.enabled {
            return;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let swept = (before - entries.len()) as u64;
        if swept > 0 {
            debug!(swept, "Swept expired cache entries");
        }

        entries.insert(key, CachedResponse::new(value));
        let size = entries.len();
        self.record(|stats| {
            stats.total_expirations += swept;
            stats.cache_size = size;
        });
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn get_stats(&self) -> CacheStats {
        let mut result = self.stats.read().unwrap_or_else(PoisonError::into_inner).clone();
        result.cache_size = self.entries.read().unwrap_or_else(PoisonError::into_inner).len();
        result
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let cleared_count = entries.len();
        entries.clear();
        self.record(|stats| stats.cache_size = 0);
        debug!(cleared_count, "Cleared response cache");
    }

    /// The time-to-live applied to entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the cache stores responses.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.stats.write().unwrap_or_else(PoisonError::into_inner));
    }
}
