use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Cache introspection, as served by `GET /cache/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    pub connected: bool,
    pub total_keys: u64,
    pub embedding_cache_keys: u64,
    pub search_cache_keys: u64,
    pub vector_cache_keys: u64,
    #[schema(example = "1.21M")]
    pub memory_usage: String,
    pub hits: u64,
    pub misses: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStats {
    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            total_keys: 0,
            embedding_cache_keys: 0,
            search_cache_keys: 0,
            vector_cache_keys: 0,
            memory_usage: "unknown".to_string(),
            hits: 0,
            misses: 0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheClearResponse {
    pub success: bool,
    pub keys_deleted: u64,
    #[schema(example = "Cleared 12 cache entries matching pattern 'search'")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheHealth {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub connected: bool,
    /// Backend kind, e.g. `redis`
    pub backend: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearQuery {
    /// Tier to clear (`embedding`, `search`, `vector`); omit to clear everything
    pub pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_stats_shape() {
        let json = serde_json::to_value(CacheStats::disconnected("connection refused")).unwrap();
        assert_eq!(json["connected"], false);
        assert_eq!(json["total_keys"], 0);
        assert_eq!(json["error"], "connection refused");
    }

    #[test]
    fn test_error_omitted_when_connected() {
        let stats = CacheStats {
            error: None,
            connected: true,
            ..CacheStats::disconnected("")
        };
        let json = serde_json::to_value(stats).unwrap();
        assert!(json.get("error").is_none());
    }
}
