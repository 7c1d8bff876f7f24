//! Key/value store used for cache-aside search results.
//!
//! The service only needs `get` and `set` with a TTL. Redis backs it in
//! production; [`MemoryCache`] is a drop-in for tests and local runs.

use async_trait::async_trait;

pub mod memory;
pub mod redis_impl;

pub use self::memory::MemoryCache;
pub use self::redis_impl::RedisCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Raw bytes stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key` for `ttl_seconds`.
    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError>;
}
