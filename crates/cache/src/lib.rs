//! Shared key-value store for the response cache and the rate limiter.
//!
//! Production uses Redis so horizontal scaling stays correct (every
//! gateway instance sees the same counters and cached responses). The
//! [`MemoryStore`] implements the same trait for hermetic tests and
//! cache-less local runs.

pub mod memory;
pub mod redis_store;
pub mod throttle;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

/// Errors from the store layer. Callers on the hot path absorb these
/// (treat as miss / dropped write) rather than failing the request.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// The store operations the gateway needs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a value with a TTL; entries are immutable until they expire.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob pattern (e.g. `search:*`).
    async fn delete_pattern(&self, pattern: &str) -> Result<(), CacheError>;

    /// Increment a counter, applying `ttl` when the key is first created.
    /// Returns the count after the increment.
    async fn incr_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), CacheError>;
}
