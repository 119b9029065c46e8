//! Readiness and backend health handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use domain_cache::ConnectionState;
use database::redis::HealthStatus;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BackendHealth {
    pub status: &'static str,
    pub backend: &'static str,
    pub connection_state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<HealthStatus>,
}

/// 200 when the cache backend answers a probe, 503 otherwise
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "cache",
        Box::pin(async {
            if state.cache.is_healthy().await {
                Ok(())
            } else {
                Err(format!("{} backend is not reachable", state.cache.backend_name()))
            }
        }),
    )];

    run_health_checks(checks).await
}

/// Timed `PING` against Redis; `skipped` when another backend is configured
pub async fn redis_health_handler(State(state): State<AppState>) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        let body = BackendHealth {
            status: "skipped",
            backend: state.cache.backend_name(),
            connection_state: state.cache.connection_state(),
            probe: None,
        };
        return (StatusCode::OK, Json(body)).into_response();
    };

    let probe = redis.health().await;
    let (code, status) = if probe.healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let body = BackendHealth {
        status,
        backend: "redis",
        connection_state: state.cache.connection_state(),
        probe: Some(probe),
    };
    (code, Json(body)).into_response()
}
