use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{BackendInfo, CacheBackend};
use crate::error::{CacheError, CacheResult};

struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local backend.
///
/// Expired entries are dropped lazily on access and on pattern scans.
/// [`set_available`](Self::set_available) simulates an outage: while
/// unavailable every call fails with [`CacheError::Unavailable`].
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn entries(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        if !self.is_available() {
            return Err(CacheError::Unavailable);
        }
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
        entries.retain(|_, entry| entry.is_live(now));
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> CacheResult<()> {
        self.entries().map(|_| ())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries()?;
        let now = Instant::now();

        let value = match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };

        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let mut entries = self.entries()?;
        Self::purge_expired(&mut entries, Instant::now());

        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }

    async fn count_matching(&self, pattern: &str) -> CacheResult<u64> {
        let mut entries = self.entries()?;
        Self::purge_expired(&mut entries, Instant::now());

        Ok(entries.keys().filter(|key| glob_match(pattern, key)).count() as u64)
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        let mut entries = self.entries()?;
        Self::purge_expired(&mut entries, Instant::now());

        let bytes: usize = entries
            .iter()
            .map(|(key, entry)| key.len() + entry.value.len())
            .sum();

        Ok(BackendInfo {
            total_keys: entries.len() as u64,
            memory_usage: human_bytes(bytes as u64),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}

/// Redis-style glob supporting `*` and `?`
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// Format a byte count the way Redis reports `used_memory_human`
pub(crate) fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];

    if bytes < 1024 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("hsai:*", "hsai:search:drill::5"));
        assert!(glob_match("hsai:search:*", "hsai:search:"));
        assert!(!glob_match("hsai:search:*", "hsai:vector:abc"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*:x:*", "p:x:q"));
        assert!(!glob_match("hsai:*", "other:embedding:x"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512B");
        assert_eq!(human_bytes(2048), "2.00K");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00M");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_ttl_never_expires() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(backend.count_matching("*").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let backend = MemoryCacheBackend::new();
        backend.set_available(false);

        assert!(matches!(backend.ping().await, Err(CacheError::Unavailable)));
        assert!(backend.get("k").await.is_err());
        assert!(backend.set_ex("k", "v", Duration::from_secs(1)).await.is_err());

        backend.set_available(true);
        assert!(backend.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_and_count_matching() {
        let backend = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set_ex("hsai:embedding:a", "1", ttl).await.unwrap();
        backend.set_ex("hsai:search:b::5", "2", ttl).await.unwrap();
        backend.set_ex("other:embedding:c", "3", ttl).await.unwrap();

        assert_eq!(backend.count_matching("hsai:*").await.unwrap(), 2);
        assert_eq!(
            backend.delete_matching("hsai:embedding:*").await.unwrap(),
            1
        );
        assert_eq!(backend.count_matching("hsai:*").await.unwrap(), 1);
        assert_eq!(backend.count_matching("other:*").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_info_tracks_hits_and_misses() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_ex("k", "value", Duration::from_secs(60))
            .await
            .unwrap();

        backend.get("k").await.unwrap();
        backend.get("missing").await.unwrap();
        backend.get("missing").await.unwrap();

        let info = backend.info().await.unwrap();
        assert_eq!(info.total_keys, 1);
        assert_eq!(info.hits, 1);
        assert_eq!(info.misses, 2);
        assert_eq!(info.memory_usage, "6B");
    }
}
