//! Prometheus metrics for the search services.
//!
//! - recorder installation and the `/metrics` handler
//! - [`CacheMetrics`] for tier hits, misses, writes and backend errors
//! - [`SecurityMetrics`] for admission and authentication decisions
//! - [`middleware::metrics_middleware`] for per-route HTTP metrics
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, CacheMetrics};
//!
//! init_metrics();
//! CacheMetrics::record_hit("embedding");
//!
//! let app = Router::new().route("/metrics", get(metrics_handler));
//! ```

pub mod cache;
pub mod middleware;
pub mod security;

pub use cache::CacheMetrics;
pub use middleware::metrics_middleware;
pub use security::SecurityMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Idempotent. If another recorder is already installed the returned handle
/// still renders, but only metrics recorded through it appear.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => info!("Prometheus metrics recorder initialized"),
            Err(e) => warn!(error = %e, "Metrics recorder already installed"),
        }

        register_metric_descriptions();
        handle
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// `GET /metrics` in Prometheus text format
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "HTTP responses with a 4xx or 5xx status"
    );

    describe_counter!("cache_hits_total", "Cache hits by tier");
    describe_counter!("cache_misses_total", "Cache misses by tier");
    describe_counter!("cache_writes_total", "Cache writes by tier and outcome");
    describe_counter!(
        "cache_backend_errors_total",
        "Cache backend failures and timeouts by operation"
    );
    describe_gauge!(
        "cache_backend_connected",
        "1 while the cache backend is reachable, 0 otherwise"
    );
    describe_counter!("cache_keys_cleared_total", "Keys removed by admin clears");

    describe_counter!(
        "rate_limit_decisions_total",
        "Rate limiter decisions by caller class and outcome"
    );
    describe_counter!(
        "api_key_rejections_total",
        "Requests rejected by API key guards, by reason"
    );
    describe_gauge!(
        "rate_limit_tracked_identifiers",
        "Identifiers currently holding a rate-limit window"
    );
}
