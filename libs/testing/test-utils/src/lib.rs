//! Shared test infrastructure for the cache and security crates.
//!
//! - `TestRedis`: throwaway Redis 8 container (feature `redis`, default)
//! - [`TestDataBuilder`]: deterministic queries, embeddings, SKUs and keys
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let data = TestDataBuilder::from_test_name("my_redis_test");
//!     let embedding = data.embedding(1536);
//! }
//! ```

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Seeded generator for reproducible test inputs.
///
/// The same seed (or test name) always yields the same values, so keys
/// derived from them are stable across runs.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from a hash of the test name
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A short search query unique to this seed, e.g. `"cordless drill 1234"`
    pub fn query(&self, base: &str) -> String {
        format!("{} {}", base, self.seed % 10_000)
    }

    /// A query longer than `min_len` characters
    pub fn long_query(&self, min_len: usize) -> String {
        let mut query = self.query("heavy duty outdoor extension cord");
        while query.len() <= min_len {
            query.push_str(" with weatherproof cover");
        }
        query
    }

    /// Deterministic pseudo-random vector with components in [-1, 1)
    pub fn embedding(&self, dimensions: usize) -> Vec<f32> {
        let mut state = self.seed | 1;
        (0..dimensions)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }

    /// `count` SKU identifiers, e.g. `SKU-1234-000`
    pub fn skus(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("SKU-{}-{:03}", self.seed % 10_000, i))
            .collect()
    }

    /// An address in 10.0.0.0/8 derived from the seed and `n`
    pub fn client_ip(&self, n: u8) -> String {
        let bytes = self.seed.to_le_bytes();
        format!("10.{}.{}.{}", bytes[0], bytes[1], n)
    }

    /// A fake API key with the given role prefix
    pub fn api_key(&self, role: &str) -> String {
        format!("{}-key-{:016x}", role, self.seed)
    }
}
