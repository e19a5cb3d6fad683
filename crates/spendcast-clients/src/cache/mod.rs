//! Time-bounded response caching for collaborator calls.
//!
//! Identical requests repeated within the configured window are answered from
//! memory instead of reaching the collaborator again. Entries are keyed by a
//! fingerprint of the request and expire on lookup once the window has passed.

pub mod cache;
pub mod config;
pub mod types;

pub use cache::ResponseCache;
pub use config::{CacheConfig, CacheConfigError};
pub use types::{CacheKey, CacheStats, CachedResponse};
