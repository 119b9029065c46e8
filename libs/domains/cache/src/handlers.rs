use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
};
use axum_helpers::{
    AuditActor, AuditEvent, AuditOutcome, ClientIp, extract_user_agent,
    errors::responses::{
        BadRequestResponse, ForbiddenResponse, InternalServerErrorResponse,
        ServiceUnavailableResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::connection::ConnectionState;
use crate::error::CacheResult;
use crate::models::{CacheClearResponse, CacheHealth, CacheStats, ClearQuery};
use crate::store::TieredCache;
use crate::tier::CacheTier;

#[derive(OpenApi)]
#[openapi(
    paths(cache_stats, cache_health, clear_cache),
    components(
        schemas(CacheStats, CacheClearResponse, CacheHealth, CacheTier, ConnectionState),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse,
            ServiceUnavailableResponse
        )
    ),
    tags(
        (name = "Cache", description = "Cache introspection and administration")
    )
)]
pub struct ApiDoc;

/// Public cache routes: `GET /cache/stats`, `GET /cache/health`
pub fn router(cache: Arc<TieredCache>) -> Router {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/health", get(cache_health))
        .with_state(cache)
}

/// Admin cache routes: `DELETE /cache/clear`.
///
/// Carries no authentication of its own; the caller layers the admin key guard.
pub fn admin_router(cache: Arc<TieredCache>) -> Router {
    Router::new()
        .route("/cache/clear", delete(clear_cache))
        .with_state(cache)
}

/// Cache statistics
#[utoipa::path(
    get,
    path = "/cache/stats",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache statistics; `connected` is false when the backend is down", body = CacheStats)
    )
)]
async fn cache_stats(State(cache): State<Arc<TieredCache>>) -> Json<CacheStats> {
    Json(cache.stats().await)
}

/// Cache backend health
#[utoipa::path(
    get,
    path = "/cache/health",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache is operational", body = CacheHealth),
        (status = 503, description = "Cache backend is unreachable", body = CacheHealth)
    )
)]
async fn cache_health(State(cache): State<Arc<TieredCache>>) -> impl IntoResponse {
    let connected = cache.is_healthy().await;
    let backend = cache.backend_name().to_string();

    if connected {
        (
            StatusCode::OK,
            Json(CacheHealth {
                status: "healthy".to_string(),
                connected,
                backend,
                message: "Cache is operational".to_string(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CacheHealth {
                status: "unhealthy".to_string(),
                connected,
                backend,
                message: "Cache backend is not connected".to_string(),
            }),
        )
    }
}

/// Clear cache entries, optionally scoped to one tier
#[utoipa::path(
    delete,
    path = "/cache/clear",
    tag = "Cache",
    params(ClearQuery),
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Entries cleared", body = CacheClearResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn clear_cache(
    State(cache): State<Arc<TieredCache>>,
    client_ip: ClientIp,
    actor: Option<Extension<AuditActor>>,
    headers: HeaderMap,
    Query(query): Query<ClearQuery>,
) -> CacheResult<Json<CacheClearResponse>> {
    let pattern = query
        .pattern
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let result = cache.clear(pattern).await;

    let outcome = if result.is_ok() {
        AuditOutcome::Success
    } else {
        AuditOutcome::Failure
    };
    AuditEvent::new("cache.clear", outcome)
        .with_actor(actor.map(|Extension(AuditActor(actor))| actor))
        .with_resource(Some(pattern.unwrap_or("*").to_string()))
        .with_client_ip(Some(client_ip.to_string()))
        .with_user_agent(extract_user_agent(&headers))
        .with_details(serde_json::json!({ "keys_deleted": result.as_ref().ok() }))
        .log();

    let keys_deleted = result?;
    let message = match pattern {
        Some(pattern) => format!(
            "Cleared {} cache entries matching pattern '{}'",
            keys_deleted, pattern
        ),
        None => format!("Cleared all {} cache entries", keys_deleted),
    };

    Ok(Json(CacheClearResponse {
        success: true,
        keys_deleted,
        message,
    }))
}
