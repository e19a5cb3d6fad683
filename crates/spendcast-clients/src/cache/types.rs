//! Core data types for response caching.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Cache key for identifying cached responses.
///
/// The key is a SHA-256 fingerprint over the request parts, so tokens and
/// payloads never sit in memory as plain map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key from the parts that identify a request.
    ///
    /// Parts are length-prefixed before hashing so `["ab", "c"]` and `["a", "bc"]` differ.
    #[must_use]
    pub fn fingerprint(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex-encoded fingerprint.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A cached response with metadata.
#[derive(Debug, Clone)]
pub struct CachedResponse<V> {
    /// The cached value.
    pub value: V,
    /// When the value was inserted.
    pub inserted_at: Instant,
    /// Number of times this entry has been served.
    pub access_count: u64,
}

impl<V> CachedResponse<V> {
    /// Create a new cache entry stamped with the current time.
    pub fn new(value: V) -> Self {
        Self { value, inserted_at: Instant::now(), access_count: 0 }
    }

    /// Whether this entry is older than `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }

    /// Record that this entry was served.
    pub fn touch(&mut self) {
        self.access_count += 1;
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub total_hits: u64,
    /// Lookups that found nothing usable.
    pub total_misses: u64,
    /// Entries dropped because their window had passed.
    pub total_expirations: u64,
    /// Current number of entries.
    pub cache_size: usize,
}
