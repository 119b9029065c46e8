//! Catalog search cache
//!
//! Three independent tiers sit in front of the expensive steps of a search:
//!
//! | Tier | Maps | TTL |
//! |------|------|-----|
//! | `embedding` | text → embedding vector | 1h |
//! | `vector` | (embedding, k) → SKU list | 15m |
//! | `search` | (query, limit) → full results | 30m |
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ Handlers / Service   │  ← HTTP admin surface, get-or-compute front
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │     TieredCache      │  ← keys, TTLs, JSON payloads
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │ DegradationController│  ← timeouts, never-raise, connection state
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │    CacheBackend      │  ← Redis or process-local memory
//! └──────────────────────┘
//! ```
//!
//! A backend outage is never an error for readers and writers: reads miss,
//! writes report `false`, and the caller recomputes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_cache::{CacheConfig, MemoryCacheBackend, TieredCache};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let cache = TieredCache::new(Arc::new(MemoryCacheBackend::new()), &CacheConfig::default());
//!
//! if cache.get_embedding("hammer").await.is_none() {
//!     let embedding = vec![0.1, 0.2, 0.3];
//!     cache.set_embedding("hammer", &embedding).await;
//! }
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod degradation;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod models;
pub mod service;
pub mod store;
pub mod tier;

pub use backend::{BackendInfo, CacheBackend, MemoryCacheBackend, RedisCacheBackend};
pub use config::{BackendKind, CacheConfig};
pub use connection::ConnectionState;
pub use degradation::DegradationController;
pub use error::{CacheError, CacheResult};
pub use handlers::ApiDoc;
pub use keys::{KeyBuilder, KeyPayload};
pub use models::{CacheClearResponse, CacheHealth, CacheStats, ClearQuery};
pub use service::{CachedSearchService, EmbeddingProvider, VectorIndex};
pub use store::TieredCache;
pub use tier::{CacheTier, TtlPolicy};
