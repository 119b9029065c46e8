//! Cache tier metrics.

use metrics::{counter, gauge};

/// Recorder for the tiered cache
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn record_hit(tier: &'static str) {
        counter!("cache_hits_total", "tier" => tier).increment(1);
    }

    pub fn record_miss(tier: &'static str) {
        counter!("cache_misses_total", "tier" => tier).increment(1);
    }

    pub fn record_write(tier: &'static str, stored: bool) {
        let outcome = if stored { "stored" } else { "skipped" };
        counter!("cache_writes_total", "tier" => tier, "outcome" => outcome).increment(1);
    }

    /// Backend call failed or timed out (`operation` is e.g. `get`, `set`, `ping`)
    pub fn record_backend_error(operation: &'static str) {
        counter!("cache_backend_errors_total", "operation" => operation).increment(1);
    }

    pub fn set_connected(connected: bool) {
        gauge!("cache_backend_connected").set(if connected { 1.0 } else { 0.0 });
    }

    pub fn record_cleared(scope: &str, deleted: u64) {
        counter!("cache_keys_cleared_total", "scope" => scope.to_string()).increment(deleted);
    }
}
