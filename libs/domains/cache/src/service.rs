use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::CacheResult;
use crate::store::TieredCache;

/// `embed(text) -> vector`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> CacheResult<Vec<f32>>;
}

/// `nearest(vector, k) -> SKUs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn nearest(&self, embedding: &[f32], k: usize) -> CacheResult<Vec<String>>;
}

/// Get-or-compute front for the search pipeline.
///
/// On a hit the upstream is never called. On a miss the upstream result is
/// written back best-effort; upstream errors propagate unchanged.
pub struct CachedSearchService<E, V> {
    cache: Arc<TieredCache>,
    embedder: E,
    index: V,
}

impl<E, V> CachedSearchService<E, V>
where
    E: EmbeddingProvider,
    V: VectorIndex,
{
    pub fn new(cache: Arc<TieredCache>, embedder: E, index: V) -> Self {
        Self {
            cache,
            embedder,
            index,
        }
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    #[instrument(skip(self))]
    pub async fn embed(&self, text: &str) -> CacheResult<Vec<f32>> {
        if let Some(embedding) = self.cache.get_embedding(text).await {
            debug!("Embedding served from cache");
            return Ok(embedding);
        }

        let embedding = self.embedder.embed(text).await?;
        self.cache.set_embedding(text, &embedding).await;
        Ok(embedding)
    }

    #[instrument(skip(self, embedding), fields(dimensions = embedding.len()))]
    pub async fn nearest_skus(&self, embedding: &[f32], limit: usize) -> CacheResult<Vec<String>> {
        if let Some(skus) = self.cache.get_vector_skus(embedding, limit).await {
            debug!("Vector search served from cache");
            return Ok(skus);
        }

        let skus = self.index.nearest(embedding, limit).await?;
        self.cache.set_vector_skus(embedding, limit, &skus).await;
        Ok(skus)
    }

    /// Full search result for `(query, limit)`, computing it with `compute` on a miss
    #[instrument(skip(self, compute))]
    pub async fn search<T, F, Fut>(&self, query: &str, limit: usize, compute: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        if let Some(results) = self.cache.get_search_results(query, limit).await {
            debug!("Search results served from cache");
            return Ok(results);
        }

        let results = compute().await?;
        self.cache.set_search_results(query, limit, &results).await;
        Ok(results)
    }

    /// Text query to SKU list through the embedding and vector tiers
    pub async fn search_skus(&self, query: &str, limit: usize) -> CacheResult<Vec<String>> {
        let embedding = self.embed(query).await?;
        self.nearest_skus(&embedding, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryCacheBackend;
    use crate::config::CacheConfig;
    use crate::error::CacheError;

    fn cache() -> Arc<TieredCache> {
        Arc::new(TieredCache::new(
            Arc::new(MemoryCacheBackend::new()),
            &CacheConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_embed_calls_provider_once() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .times(1)
            .returning(|_| Ok(vec![0.5, -0.5]));
        let service = CachedSearchService::new(cache(), embedder, MockVectorIndex::new());

        assert_eq!(service.embed("hammer").await.unwrap(), vec![0.5, -0.5]);
        assert_eq!(service.embed("hammer").await.unwrap(), vec![0.5, -0.5]);
    }

    #[tokio::test]
    async fn test_search_skus_uses_both_tiers() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().times(1).returning(|_| Ok(vec![1.0, 2.0]));
        let mut index = MockVectorIndex::new();
        index
            .expect_nearest()
            .withf(|embedding, k| embedding == [1.0, 2.0] && *k == 3)
            .times(1)
            .returning(|_, _| Ok(vec!["SKU-1".into(), "SKU-2".into(), "SKU-3".into()]));
        let service = CachedSearchService::new(cache(), embedder, index);

        let first = service.search_skus("cordless drill", 3).await.unwrap();
        let second = service.search_skus("cordless drill", 3).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_upstream_error_propagates_and_is_not_cached() {
        let mut embedder = MockEmbeddingProvider::new();
        let mut calls = 0;
        embedder.expect_embed().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(CacheError::Upstream("rate limited by provider".into()))
            } else {
                Ok(vec![0.25])
            }
        });
        let service = CachedSearchService::new(cache(), embedder, MockVectorIndex::new());

        assert!(matches!(
            service.embed("saw").await,
            Err(CacheError::Upstream(_))
        ));
        assert_eq!(service.embed("saw").await.unwrap(), vec![0.25]);
    }

    #[tokio::test]
    async fn test_search_computes_only_on_miss() {
        let service =
            CachedSearchService::new(cache(), MockEmbeddingProvider::new(), MockVectorIndex::new());

        let first: Vec<String> = service
            .search("ladder", 10, || async { Ok(vec!["SKU-9".to_string()]) })
            .await
            .unwrap();

        let second: Vec<String> = service
            .search("ladder", 10, || async {
                Err(CacheError::Upstream("should not be called".into()))
            })
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_outage_falls_through_to_upstream() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend.set_available(false);
        let cache = Arc::new(TieredCache::new(backend, &CacheConfig::default()));

        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().times(2).returning(|_| Ok(vec![0.1]));
        let service = CachedSearchService::new(cache, embedder, MockVectorIndex::new());

        assert!(service.embed("hammer").await.is_ok());
        assert!(service.embed("hammer").await.is_ok());
    }
}
