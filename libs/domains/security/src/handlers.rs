use axum::{
    Extension, Json, Router,
    extract::State,
    http::HeaderMap,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, ClientIp, extract_user_agent, security_header_names,
    errors::responses::{ForbiddenResponse, TooManyRequestsResponse, UnauthorizedResponse},
};
use chrono::{SecondsFormat, Utc};
use tracing::info;
use utoipa::OpenApi;

use crate::api_keys::KeyClass;
use crate::error::RATE_LIMIT_HEADERS;
use crate::middleware::{Caller, SecurityContext, require_admin_key, require_api_key};
use crate::models::{
    ApiKeyAuthStatus, ApiKeyValidation, RateLimitCheck, RateLimitReset, RateLimitingStatus,
    SecurityAudit, SecurityFeatures, SecurityHeadersTest, SecurityInfo,
};
use crate::rate_limit::{Quotas, RateLimitStats};

#[derive(OpenApi)]
#[openapi(
    paths(
        security_info,
        rate_limit_check,
        security_headers_test,
        validate_api_key,
        rate_limit_stats,
        reset_rate_limits,
        security_audit
    ),
    components(
        schemas(
            SecurityInfo,
            SecurityAudit,
            SecurityFeatures,
            RateLimitingStatus,
            ApiKeyAuthStatus,
            SecurityHeadersTest,
            RateLimitCheck,
            RateLimitReset,
            RateLimitStats,
            ApiKeyValidation,
            Quotas,
            KeyClass
        ),
        responses(UnauthorizedResponse, ForbiddenResponse, TooManyRequestsResponse)
    ),
    tags(
        (name = "Security", description = "API keys and rate limiting")
    )
)]
pub struct ApiDoc;

/// All `/security/*` routes, each behind the guard it needs
pub fn router(ctx: SecurityContext) -> Router {
    let admin = Router::new()
        .route("/security/rate-limit/stats", get(rate_limit_stats))
        .route("/security/rate-limit/reset", post(reset_rate_limits))
        .route("/security/audit", get(security_audit))
        .route_layer(from_fn_with_state(ctx.clone(), require_admin_key));

    let keyed = Router::new()
        .route("/security/api-key/validate", post(validate_api_key))
        .route_layer(from_fn_with_state(ctx.clone(), require_api_key));

    Router::new()
        .route("/security/info", get(security_info))
        .route("/security/rate-limit/check", get(rate_limit_check))
        .route("/security/headers/test", get(security_headers_test))
        .merge(admin)
        .merge(keyed)
        .with_state(ctx)
}

/// Security configuration summary
#[utoipa::path(
    get,
    path = "/security/info",
    tag = "Security",
    responses(
        (status = 200, description = "Security configuration", body = SecurityInfo)
    )
)]
async fn security_info(State(ctx): State<SecurityContext>) -> Json<SecurityInfo> {
    Json(SecurityInfo {
        rate_limiting_enabled: ctx.rate_limiting_enabled,
        api_key_auth_enabled: !ctx.registry.is_empty(),
        admin_keys_count: ctx.registry.admin_count(),
        user_keys_count: ctx.registry.user_count(),
        rate_limits: *ctx.limiter.quotas(),
        security_headers_enabled: true,
    })
}

/// Current rate limit status of the caller, without consuming quota
#[utoipa::path(
    get,
    path = "/security/rate-limit/check",
    tag = "Security",
    responses(
        (status = 200, description = "Rate limit status", body = RateLimitCheck),
        (status = 429, response = TooManyRequestsResponse)
    )
)]
async fn rate_limit_check(
    State(ctx): State<SecurityContext>,
    ClientIp(client_ip): ClientIp,
    caller: Option<Extension<Caller>>,
) -> Json<RateLimitCheck> {
    let (identity, class) = match caller {
        Some(Extension(caller)) => (caller.identity, caller.class),
        None => (client_ip.clone(), KeyClass::Anonymous),
    };

    let decision = ctx.limiter.peek(&identity, class);
    info!(
        client_ip = %client_ip,
        allowed = decision.allowed,
        remaining = decision.info.remaining,
        "Rate limit status checked"
    );

    Json(RateLimitCheck {
        allowed: decision.allowed,
        limit: decision.info.limit,
        remaining: decision.info.remaining,
        reset: decision.info.reset,
        client_ip,
    })
}

/// Headers every rate-limited response is expected to carry
#[utoipa::path(
    get,
    path = "/security/headers/test",
    tag = "Security",
    responses(
        (status = 200, description = "Expected response headers", body = SecurityHeadersTest),
        (status = 429, response = TooManyRequestsResponse)
    )
)]
async fn security_headers_test(ClientIp(client_ip): ClientIp) -> Json<SecurityHeadersTest> {
    info!(client_ip = %client_ip, "Security headers test requested");

    let mut expected_headers = security_header_names();
    expected_headers.extend(RATE_LIMIT_HEADERS.iter().map(|name| name.to_string()));

    Json(SecurityHeadersTest {
        client_ip,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        expected_headers,
    })
}

/// Validate the `X-API-Key` header and report its class
#[utoipa::path(
    post,
    path = "/security/api-key/validate",
    tag = "Security",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Key is valid", body = ApiKeyValidation),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn validate_api_key(Extension(caller): Extension<Caller>) -> Json<ApiKeyValidation> {
    Json(ApiKeyValidation {
        valid: true,
        key_type: Some(caller.class),
        message: format!("Valid {} API key", caller.class),
    })
}

/// Rate limiter activity (admin)
#[utoipa::path(
    get,
    path = "/security/rate-limit/stats",
    tag = "Security",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Rate limiter statistics", body = RateLimitStats),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn rate_limit_stats(State(ctx): State<SecurityContext>) -> Json<RateLimitStats> {
    Json(ctx.limiter.stats())
}

/// Forget every rate-limit window (admin)
#[utoipa::path(
    post,
    path = "/security/rate-limit/reset",
    tag = "Security",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Windows cleared", body = RateLimitReset),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn reset_rate_limits(
    State(ctx): State<SecurityContext>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<RateLimitReset> {
    let cleared = ctx.limiter.reset();

    AuditEvent::new("rate_limit.reset", AuditOutcome::Success)
        .with_actor(caller.audit_actor())
        .with_client_ip(Some(caller.client_ip.clone()))
        .with_user_agent(extract_user_agent(&headers))
        .with_details(serde_json::json!({ "cleared_entries": cleared }))
        .log();

    Json(RateLimitReset {
        status: "success".to_string(),
        message: format!("Rate limits reset for {} tracked clients", cleared),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

const RECOMMENDATIONS: [&str; 4] = [
    "Rotate API keys regularly",
    "Watch rate limit rejections for abuse patterns",
    "Restrict admin endpoints to trusted networks",
    "Alert on spikes in api_key_rejections_total",
];

/// Live security posture (admin)
#[utoipa::path(
    get,
    path = "/security/audit",
    tag = "Security",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Security audit", body = SecurityAudit),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn security_audit(
    State(ctx): State<SecurityContext>,
    Extension(caller): Extension<Caller>,
) -> Json<SecurityAudit> {
    let stats = ctx.limiter.stats();

    let security_features = SecurityFeatures {
        rate_limiting: RateLimitingStatus {
            enabled: ctx.rate_limiting_enabled,
            active_ips: stats.active_ips,
            total_requests: stats.total_requests_last_minute,
        },
        api_key_auth: ApiKeyAuthStatus {
            enabled: !ctx.registry.is_empty(),
            admin_keys: ctx.registry.admin_count(),
            user_keys: ctx.registry.user_count(),
        },
        security_headers_enabled: true,
        structured_logging: true,
    };

    info!(
        client_ip = %caller.client_ip,
        active_ips = stats.active_ips,
        "Security audit requested"
    );

    Json(SecurityAudit {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        security_features,
        recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
    })
}
