use observability::CacheMetrics;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::connection::ConnectionState;
use crate::degradation::DegradationController;
use crate::error::{CacheError, CacheResult};
use crate::keys::{KeyBuilder, KeyPayload};
use crate::models::CacheStats;
use crate::tier::{CacheTier, TtlPolicy};

/// Characters that would widen a clear beyond one namespace segment
const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '\\'];

/// Three-tier cache in front of the embedding provider, the vector index
/// and the full search pipeline.
///
/// Reads and writes never fail: a backend outage turns reads into misses and
/// writes into `false`. Only [`clear`](Self::clear) reports backend errors.
pub struct TieredCache {
    controller: DegradationController,
    keys: KeyBuilder,
    ttl: TtlPolicy,
}

impl TieredCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            controller: DegradationController::new(
                backend,
                config.op_timeout,
                config.revalidate_interval,
            ),
            keys: KeyBuilder::new(config.key_prefix.clone()),
            ttl: config.ttl,
        }
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.controller.backend().name()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.controller.state()
    }

    /// Cached value for `payload` in `tier`, or `None` on miss, outage or malformed payload
    #[instrument(level = "debug", skip_all, fields(tier = %tier))]
    pub async fn get<T>(&self, tier: CacheTier, payload: KeyPayload<'_>, extra: Option<usize>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let key = self.keys.derive(tier, payload, extra);
        let raw = self
            .controller
            .guard("get", self.controller.backend().get(&key))
            .await
            .flatten();

        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding malformed cache payload");
                None
            }
        });

        if value.is_some() {
            CacheMetrics::record_hit(tier.as_str());
        } else {
            CacheMetrics::record_miss(tier.as_str());
        }
        value
    }

    /// Store `value` with the tier's TTL; `false` when it was not written
    #[instrument(level = "debug", skip_all, fields(tier = %tier))]
    pub async fn set<T>(
        &self,
        tier: CacheTier,
        payload: KeyPayload<'_>,
        value: &T,
        extra: Option<usize>,
    ) -> bool
    where
        T: Serialize + ?Sized,
    {
        let key = self.keys.derive(tier, payload, extra);

        let stored = match serde_json::to_string(value) {
            Ok(raw) => self
                .controller
                .guard(
                    "set",
                    self.controller
                        .backend()
                        .set_ex(&key, &raw, self.ttl.for_tier(tier)),
                )
                .await
                .is_some(),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache payload could not be serialized");
                false
            }
        };

        CacheMetrics::record_write(tier.as_str(), stored);
        stored
    }

    pub async fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.get(CacheTier::Embedding, text.into(), None).await
    }

    pub async fn set_embedding(&self, text: &str, embedding: &[f32]) -> bool {
        self.set(CacheTier::Embedding, text.into(), embedding, None)
            .await
    }

    pub async fn get_search_results<T>(&self, query: &str, limit: usize) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.get(CacheTier::Search, query.into(), Some(limit)).await
    }

    pub async fn set_search_results<T>(&self, query: &str, limit: usize, results: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.set(CacheTier::Search, query.into(), results, Some(limit))
            .await
    }

    pub async fn get_vector_skus(&self, embedding: &[f32], limit: usize) -> Option<Vec<String>> {
        self.get(CacheTier::Vector, embedding.into(), Some(limit))
            .await
    }

    pub async fn set_vector_skus(&self, embedding: &[f32], limit: usize, skus: &[String]) -> bool {
        self.set(CacheTier::Vector, embedding.into(), skus, Some(limit))
            .await
    }

    /// Delete every key under `{prefix}:{pattern}:*`, or under the whole prefix.
    ///
    /// An empty pattern clears everything. Deletion is per key and best
    /// effort; the count is what the backend actually removed.
    ///
    /// # Errors
    /// [`CacheError::InvalidPattern`] for glob characters, otherwise the
    /// backend failure (unavailable, timeout, error).
    #[instrument(skip(self))]
    pub async fn clear(&self, pattern: Option<&str>) -> CacheResult<u64> {
        let segment = pattern.map(str::trim).filter(|p| !p.is_empty());

        if let Some(invalid) = segment.filter(|s| s.contains(GLOB_CHARS)) {
            return Err(CacheError::InvalidPattern(invalid.to_string()));
        }

        let glob = self.keys.pattern(segment);
        let deleted = self
            .controller
            .execute("clear", self.controller.backend().delete_matching(&glob))
            .await?;

        CacheMetrics::record_cleared(segment.unwrap_or("all"), deleted);
        info!(pattern = %glob, deleted, "Cache cleared");
        Ok(deleted)
    }

    /// Introspection; reports `connected: false` with the error instead of failing
    pub async fn stats(&self) -> CacheStats {
        if !self.controller.ensure_available().await {
            return CacheStats::disconnected(CacheError::Unavailable.to_string());
        }

        match self.collect_stats().await {
            Ok(stats) => stats,
            Err(e) => CacheStats::disconnected(e.to_string()),
        }
    }

    async fn collect_stats(&self) -> CacheResult<CacheStats> {
        let backend = self.controller.backend();
        let info = self.controller.execute("info", backend.info()).await?;

        let mut counts = [0u64; 3];
        for (slot, tier) in counts.iter_mut().zip(CacheTier::ALL) {
            let pattern = self.keys.tier_pattern(tier);
            *slot = self
                .controller
                .execute("count", backend.count_matching(&pattern))
                .await?;
        }
        let [embedding, search, vector] = counts;

        Ok(CacheStats {
            connected: true,
            total_keys: info.total_keys,
            embedding_cache_keys: embedding,
            search_cache_keys: search,
            vector_cache_keys: vector,
            memory_usage: info.memory_usage,
            hits: info.hits,
            misses: info.misses,
            error: None,
        })
    }

    /// Fresh liveness probe, bypassing the cached verdict
    pub async fn is_healthy(&self) -> bool {
        self.controller.probe().await
    }

    pub async fn close(&self) {
        self.controller.close().await;
    }
}
