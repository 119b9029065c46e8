use async_trait::async_trait;
use database::redis::{
    ConnectionManager, HealthStatus, RedisConfig, check_health_detailed, connect_from_config,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::{BackendInfo, CacheBackend};
use crate::error::CacheResult;

/// Keys requested per `SCAN` round trip
const SCAN_BATCH: usize = 500;

/// Redis-backed store.
///
/// The connection is opened on first use and shared afterwards;
/// [`ConnectionManager`] reconnects on its own once established.
pub struct RedisCacheBackend {
    config: RedisConfig,
    connect_timeout: Duration,
    manager: RwLock<Option<ConnectionManager>>,
}

impl RedisCacheBackend {
    pub fn new(config: RedisConfig, connect_timeout: Duration) -> Self {
        Self {
            config,
            connect_timeout,
            manager: RwLock::new(None),
        }
    }

    /// Wrap an already established connection
    pub fn with_connection(config: RedisConfig, manager: ConnectionManager) -> Self {
        Self {
            config,
            connect_timeout: Duration::from_secs(5),
            manager: RwLock::new(Some(manager)),
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Timed `PING`, bypassing the degradation controller
    pub async fn health(&self) -> HealthStatus {
        let start = Instant::now();
        let probe = async {
            match self.connection().await {
                Ok(mut conn) => check_health_detailed(&mut conn).await,
                Err(e) => HealthStatus::unhealthy(e.to_string(), elapsed_ms(start)),
            }
        };

        tokio::time::timeout(self.connect_timeout * 2, probe)
            .await
            .unwrap_or_else(|_| HealthStatus::unhealthy("health check timed out", elapsed_ms(start)))
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        if let Some(manager) = self.manager.read().await.as_ref() {
            return Ok(manager.clone());
        }

        let mut slot = self.manager.write().await;
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        debug!(url = %self.config.redacted_url(), "Opening cache backend connection");
        let manager = connect_from_config(&self.config, self.connect_timeout).await?;
        *slot = Some(manager.clone());
        Ok(manager)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value = ::redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut deleted = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                deleted += ::redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<u64>(&mut conn)
                    .await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    async fn count_matching(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut count = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            count += keys.len() as u64;
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(count)
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        let mut conn = self.connection().await?;
        let total_keys: u64 = ::redis::cmd("DBSIZE").query_async(&mut conn).await?;
        let raw: String = ::redis::cmd("INFO").query_async(&mut conn).await?;

        Ok(backend_info(total_keys, &parse_info(&raw)))
    }

    async fn close(&self) {
        if self.manager.write().await.take().is_some() {
            info!("Cache backend connection released");
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Parse the `field:value` lines of an `INFO` reply, skipping section headers
pub(crate) fn parse_info(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

fn backend_info(total_keys: u64, fields: &HashMap<String, String>) -> BackendInfo {
    let number = |field: &str| {
        fields
            .get(field)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    };

    BackendInfo {
        total_keys,
        memory_usage: fields
            .get("used_memory_human")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        hits: number("keyspace_hits"),
        misses: number("keyspace_misses"),
    }
}
