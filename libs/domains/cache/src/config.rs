use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use std::str::FromStr;
use std::time::Duration;

use crate::keys::DEFAULT_PREFIX;
use crate::tier::TtlPolicy;

/// Longest accepted tier TTL (30 days)
pub const MAX_TTL_SECS: u64 = 30 * 24 * 3600;

/// Which store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Redis,
    /// Process-local, lost on restart
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("expected 'redis' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: BackendKind,
    pub key_prefix: String,
    pub ttl: TtlPolicy,
    /// Upper bound for every backend call
    pub op_timeout: Duration,
    /// How long a liveness verdict is trusted before the backend is probed again
    pub revalidate_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            key_prefix: DEFAULT_PREFIX.to_string(),
            ttl: TtlPolicy::default(),
            op_timeout: Duration::from_millis(2000),
            revalidate_interval: Duration::from_secs(5),
        }
    }
}

impl FromEnv for CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = TtlPolicy::default();

        Ok(Self {
            backend: env_parse("CACHE_BACKEND", BackendKind::Redis)?,
            key_prefix: env_or_default("CACHE_KEY_PREFIX", DEFAULT_PREFIX),
            ttl: TtlPolicy {
                embedding: ttl_from_env("CACHE_TTL_EMBEDDING_SECS", defaults.embedding)?,
                search: ttl_from_env("CACHE_TTL_SEARCH_SECS", defaults.search)?,
                vector: ttl_from_env("CACHE_TTL_VECTOR_SECS", defaults.vector)?,
            },
            op_timeout: Duration::from_millis(env_parse("CACHE_OP_TIMEOUT_MS", 2000)?),
            revalidate_interval: Duration::from_secs(env_parse("CACHE_REVALIDATE_SECS", 5)?),
        })
    }
}

/// Tier TTL in whole seconds, within `1..=MAX_TTL_SECS`
fn ttl_from_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let secs: u64 = env_parse(key, default.as_secs())?;
    if !(1..=MAX_TTL_SECS).contains(&secs) {
        return Err(ConfigError::ParseError {
            key: key.to_string(),
            details: format!("expected 1..={} seconds, got {}", MAX_TTL_SECS, secs),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "CACHE_BACKEND",
        "CACHE_KEY_PREFIX",
        "CACHE_TTL_EMBEDDING_SECS",
        "CACHE_TTL_SEARCH_SECS",
        "CACHE_TTL_VECTOR_SECS",
        "CACHE_OP_TIMEOUT_MS",
        "CACHE_REVALIDATE_SECS",
    ];

    #[test]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(VARS, || {
            assert_eq!(CacheConfig::from_env().unwrap(), CacheConfig::default());
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("CACHE_BACKEND", Some("Memory")),
                ("CACHE_KEY_PREFIX", Some("shop")),
                ("CACHE_TTL_VECTOR_SECS", Some("60")),
                ("CACHE_OP_TIMEOUT_MS", Some("250")),
            ],
            || {
                let config = CacheConfig::from_env().unwrap();
                assert_eq!(config.backend, BackendKind::Memory);
                assert_eq!(config.key_prefix, "shop");
                assert_eq!(config.ttl.vector, Duration::from_secs(60));
                assert_eq!(config.ttl.search, Duration::from_secs(1800));
                assert_eq!(config.op_timeout, Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        temp_env::with_var("CACHE_BACKEND", Some("memcached"), || {
            let err = CacheConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("CACHE_BACKEND"));
        });
    }

    #[test]
    fn test_invalid_ttl_is_rejected() {
        temp_env::with_var("CACHE_TTL_SEARCH_SECS", Some("half an hour"), || {
            assert!(CacheConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        for raw in ["0", "18446744073709551615", "2592001"] {
            temp_env::with_var("CACHE_TTL_EMBEDDING_SECS", Some(raw), || {
                let err = CacheConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("CACHE_TTL_EMBEDDING_SECS"));
            });
        }

        temp_env::with_var("CACHE_TTL_EMBEDDING_SECS", Some("2592000"), || {
            let config = CacheConfig::from_env().unwrap();
            assert_eq!(config.ttl.embedding, Duration::from_secs(MAX_TTL_SECS));
        });
    }
}
