use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use domain_security::{rate_limit_middleware, require_admin_key};
use observability::{metrics_handler, metrics_middleware};

use crate::state::AppState;

pub mod health;

/// Cache, security and metrics routes behind the rate limiter.
///
/// `/cache/clear` additionally requires an admin key. Exempt paths
/// (`/metrics`, docs) pass the limiter without being counted.
pub fn routes(state: &AppState) -> Router {
    let cache_admin = domain_cache::handlers::admin_router(state.cache.clone())
        .route_layer(from_fn_with_state(state.security.clone(), require_admin_key));

    Router::new()
        .merge(domain_cache::handlers::router(state.cache.clone()))
        .merge(cache_admin)
        .merge(domain_security::handlers::router(state.security.clone()))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn_with_state(
            state.security.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
}

/// `/ready` and `/health/redis`, probing the cache backend directly
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .route("/health/redis", get(health::redis_health_handler))
        .with_state(state)
}
