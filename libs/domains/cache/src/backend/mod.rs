//! Key-value stores the tiered cache can sit on.

mod memory;
mod redis;

pub use self::memory::MemoryCacheBackend;
pub use self::redis::RedisCacheBackend;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheResult;

/// Server-side counters reported by [`CacheBackend::info`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendInfo {
    pub total_keys: u64,
    /// Human readable, e.g. `1.21M`
    pub memory_usage: String,
    pub hits: u64,
    pub misses: u64,
}

/// Raw string store with per-key expiry.
///
/// Implementations may fail freely; the degradation layer above decides what
/// a failure means to callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short identifier for logs and health output
    fn name(&self) -> &'static str;

    /// Lightweight liveness probe
    async fn ping(&self) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete every key matching the glob `pattern`, returning how many were removed
    async fn delete_matching(&self, pattern: &str) -> CacheResult<u64>;

    async fn count_matching(&self, pattern: &str) -> CacheResult<u64>;

    async fn info(&self) -> CacheResult<BackendInfo>;

    /// Release connections; the backend may reconnect lazily afterwards
    async fn close(&self) {}
}
