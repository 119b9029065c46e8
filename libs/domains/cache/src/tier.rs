use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use utoipa::ToSchema;

/// Independent cache namespaces, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// `text -> embedding vector`
    Embedding,
    /// `(query, limit) -> full result list`
    Search,
    /// `(embedding, k) -> SKU list`
    Vector,
}

impl CacheTier {
    pub const ALL: [CacheTier; 3] = [CacheTier::Embedding, CacheTier::Search, CacheTier::Vector];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Embedding => "embedding",
            CacheTier::Search => "search",
            CacheTier::Vector => "vector",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embedding" => Ok(CacheTier::Embedding),
            "search" => Ok(CacheTier::Search),
            "vector" => Ok(CacheTier::Vector),
            other => Err(format!("unknown cache tier '{}'", other)),
        }
    }
}

/// TTL per tier, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub embedding: Duration,
    pub search: Duration,
    pub vector: Duration,
}

impl TtlPolicy {
    pub fn for_tier(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Embedding => self.embedding,
            CacheTier::Search => self.search,
            CacheTier::Vector => self.vector,
        }
    }
}

impl Default for TtlPolicy {
    /// 1h embeddings, 30m search results, 15m vector SKU lists
    fn default() -> Self {
        Self {
            embedding: Duration::from_secs(3600),
            search: Duration::from_secs(1800),
            vector: Duration::from_secs(900),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let ttl = TtlPolicy::default();
        assert_eq!(ttl.for_tier(CacheTier::Embedding).as_secs(), 3600);
        assert_eq!(ttl.for_tier(CacheTier::Search).as_secs(), 1800);
        assert_eq!(ttl.for_tier(CacheTier::Vector).as_secs(), 900);
    }

    #[test]
    fn test_tier_parse_and_display() {
        for tier in CacheTier::ALL {
            assert_eq!(tier.to_string().parse::<CacheTier>(), Ok(tier));
        }
        assert!("embeddings".parse::<CacheTier>().is_err());
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CacheTier::Vector).unwrap(),
            "\"vector\""
        );
    }
}
