//! Shared application state, built once at startup and cloned into handlers.

use database::common::RetryPolicy;
use database::redis::{RedisConfig, connect_with_retry};
use domain_cache::{BackendKind, CacheBackend, MemoryCacheBackend, RedisCacheBackend, TieredCache};
use domain_security::SecurityContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;

/// Connection attempts made before serving without a warm cache connection
const STARTUP_RETRIES: u32 = 2;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: Arc<TieredCache>,
    pub security: SecurityContext,
    /// Set when the cache runs on Redis; backs the `/health/redis` probe
    pub redis: Option<Arc<RedisCacheBackend>>,
}

impl AppState {
    /// Build the cache and security components selected by `config`.
    ///
    /// An unreachable Redis does not fail startup: the backend connects lazily
    /// and the cache degrades to misses until it does.
    pub async fn new(config: Config) -> Self {
        let redis = match config.cache.backend {
            BackendKind::Redis => Some(Arc::new(
                redis_backend(&config.redis, config.cache.op_timeout).await,
            )),
            BackendKind::Memory => None,
        };

        let backend: Arc<dyn CacheBackend> = match &redis {
            Some(redis) => redis.clone(),
            None => {
                info!("Using process-local memory cache backend");
                Arc::new(MemoryCacheBackend::new())
            }
        };

        Self::from_parts(config, backend, redis)
    }

    pub fn from_parts(
        config: Config,
        backend: Arc<dyn CacheBackend>,
        redis: Option<Arc<RedisCacheBackend>>,
    ) -> Self {
        let cache = Arc::new(TieredCache::new(backend, &config.cache));
        let security = SecurityContext::from_config(&config.security);

        Self {
            config,
            cache,
            security,
            redis,
        }
    }
}

async fn redis_backend(config: &RedisConfig, timeout: Duration) -> RedisCacheBackend {
    let policy = RetryPolicy::new()
        .with_max_retries(STARTUP_RETRIES)
        .with_max_delay(Duration::from_secs(2));

    match connect_with_retry(config, timeout, policy).await {
        Ok(manager) => {
            info!(url = %config.redacted_url(), "Cache backend connected");
            RedisCacheBackend::with_connection(config.clone(), manager)
        }
        Err(e) => {
            warn!(
                url = %config.redacted_url(),
                error = %e,
                "Cache backend unreachable at startup, serving uncached until it recovers"
            );
            RedisCacheBackend::new(config.clone(), timeout)
        }
    }
}
