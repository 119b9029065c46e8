//! Admission and authentication middlewares.
//!
//! ```ignore
//! let ctx = SecurityContext::new(registry, limiter, true);
//!
//! let admin = cache_handlers::admin_router(cache)
//!     .route_layer(axum::middleware::from_fn_with_state(ctx.clone(), require_admin_key));
//!
//! let app = Router::new()
//!     .merge(admin)
//!     .layer(axum::middleware::from_fn_with_state(ctx, rate_limit_middleware));
//! ```

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_helpers::{AuditActor, AuditEvent, AuditOutcome, ClientIp, extract_user_agent};
use observability::SecurityMetrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api_keys::{ApiKeyRegistry, KeyClass, fingerprint};
use crate::config::SecurityConfig;
use crate::error::{SecurityError, set_rate_limit_headers};
use crate::rate_limit::RateLimiter;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths never counted against a quota
const EXEMPT_PATHS: &[&str] = &["/health", "/ready", "/health/redis", "/metrics"];

/// Prefixes of the API documentation routes, also exempt
const EXEMPT_PREFIXES: &[&str] = &["/swagger-ui", "/api-docs", "/redoc", "/rapidoc", "/scalar"];

/// Shared state of the security middlewares and handlers
#[derive(Clone)]
pub struct SecurityContext {
    pub registry: Arc<ApiKeyRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub rate_limiting_enabled: bool,
}

impl SecurityContext {
    pub fn new(
        registry: Arc<ApiKeyRegistry>,
        limiter: Arc<RateLimiter>,
        rate_limiting_enabled: bool,
    ) -> Self {
        Self {
            registry,
            limiter,
            rate_limiting_enabled,
        }
    }

    /// Build the registry and limiter from configuration
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            Arc::new(ApiKeyRegistry::new(
                config.admin_keys.clone(),
                config.user_keys.clone(),
            )),
            Arc::new(RateLimiter::new(config.rate_limit.quotas)),
            config.rate_limit.enabled,
        )
    }
}

/// Who is calling, inserted into request extensions by the middlewares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub class: KeyClass,
    /// Rate-limit identity: the client IP, or `key:{fingerprint}` for API keys
    pub identity: String,
    pub client_ip: String,
}

impl Caller {
    fn resolve(registry: &ApiKeyRegistry, headers: &HeaderMap, client_ip: String) -> Self {
        let known = api_key(headers).and_then(|key| registry.classify(key).map(|c| (c, key)));

        match known {
            Some((class, key)) => Self {
                class,
                identity: format!("key:{}", fingerprint(key)),
                client_ip,
            },
            None => Self {
                class: KeyClass::Anonymous,
                identity: client_ip.clone(),
                client_ip,
            },
        }
    }

    /// `{class}:{fingerprint}` for keyed callers, `None` for anonymous ones
    pub fn audit_actor(&self) -> Option<String> {
        self.identity
            .strip_prefix("key:")
            .map(|fp| format!("{}:{}", self.class, fp))
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Count every request against its caller's quota.
///
/// Unknown keys are limited as anonymous callers; the auth guards reject them
/// afterwards. Admitted responses carry `X-RateLimit-*` headers, rejections
/// are 429 with `Retry-After`.
pub async fn rate_limit_middleware(
    State(ctx): State<SecurityContext>,
    ClientIp(client_ip): ClientIp,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = Caller::resolve(&ctx.registry, request.headers(), client_ip);

    if !ctx.rate_limiting_enabled || is_exempt(request.uri().path()) {
        request.extensions_mut().insert(caller);
        return next.run(request).await;
    }

    let decision = ctx.limiter.check(&caller.identity, caller.class);

    if !decision.allowed {
        warn!(
            client_ip = %caller.client_ip,
            key_type = %caller.class,
            limit = decision.info.limit,
            current = decision.info.current,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return SecurityError::RateLimited {
            info: decision.info,
            retry_after: decision.retry_after(ctx.limiter.now()),
        }
        .into_response();
    }

    request.extensions_mut().insert(caller);
    let mut response = next.run(request).await;
    set_rate_limit_headers(response.headers_mut(), &decision.info);
    response
}

/// Require a user or admin key (401 otherwise)
pub async fn require_api_key(
    State(ctx): State<SecurityContext>,
    client_ip: ClientIp,
    request: Request,
    next: Next,
) -> Response {
    authorize(&ctx, KeyClass::User, client_ip, request, next).await
}

/// Require an admin key: 401 when missing or unknown, 403 for a user key
pub async fn require_admin_key(
    State(ctx): State<SecurityContext>,
    client_ip: ClientIp,
    request: Request,
    next: Next,
) -> Response {
    authorize(&ctx, KeyClass::Admin, client_ip, request, next).await
}

async fn authorize(
    ctx: &SecurityContext,
    required: KeyClass,
    ClientIp(client_ip): ClientIp,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let headers = request.headers();

    let result = match api_key(headers) {
        None if required == KeyClass::Admin => {
            Err(SecurityError::MissingApiKey("Admin API key required"))
        }
        None => Err(SecurityError::MissingApiKey("API key required")),
        Some(key) => match ctx.registry.classify(key) {
            None => Err(SecurityError::InvalidApiKey),
            Some(class) if !class.satisfies(required) => Err(SecurityError::AdminRequired),
            Some(class) => Ok((class, fingerprint(key))),
        },
    };

    match result {
        Ok((class, fp)) => {
            info!(client_ip = %client_ip, key_type = %class, path = %path, "API key authenticated");

            let caller = Caller {
                class,
                identity: format!("key:{}", fp),
                client_ip,
            };
            let actor = AuditActor(format!("{}:{}", class, fp));
            request.extensions_mut().insert(caller);
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(err) => {
            if let Some(reason) = err.rejection_reason() {
                SecurityMetrics::record_key_rejection(reason);
            }

            if required == KeyClass::Admin {
                let actor = api_key(headers).map(|key| match ctx.registry.classify(key) {
                    Some(class) => format!("{}:{}", class, fingerprint(key)),
                    None => format!("unknown:{}", fingerprint(key)),
                });
                AuditEvent::new("admin.access", AuditOutcome::Denied)
                    .with_actor(actor)
                    .with_resource(Some(path))
                    .with_client_ip(Some(client_ip))
                    .with_user_agent(extract_user_agent(headers))
                    .with_details(serde_json::json!({ "reason": err.to_string() }))
                    .log();
            } else {
                debug!(client_ip = %client_ip, path = %path, error = %err, "API key rejected");
            }

            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn registry() -> ApiKeyRegistry {
        ApiKeyRegistry::new(vec!["admin-key".into()], vec!["user-key".into()])
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/ready"));
        assert!(is_exempt("/metrics"));
        assert!(is_exempt("/swagger-ui/index.html"));
        assert!(is_exempt("/api-docs/openapi.json"));
        assert!(!is_exempt("/cache/stats"));
        assert!(!is_exempt("/healthz"));
    }

    #[test]
    fn test_caller_anonymous_by_ip() {
        let caller = Caller::resolve(&registry(), &HeaderMap::new(), "10.0.0.1".into());
        assert_eq!(caller.class, KeyClass::Anonymous);
        assert_eq!(caller.identity, "10.0.0.1");
        assert_eq!(caller.audit_actor(), None);
    }

    #[test]
    fn test_caller_keyed_by_fingerprint() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("admin-key"));

        let caller = Caller::resolve(&registry(), &headers, "10.0.0.1".into());
        assert_eq!(caller.class, KeyClass::Admin);
        assert_eq!(caller.identity, format!("key:{}", fingerprint("admin-key")));
        assert_eq!(
            caller.audit_actor(),
            Some(format!("admin:{}", fingerprint("admin-key")))
        );
    }

    #[test]
    fn test_unknown_key_counts_as_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("guess"));

        let caller = Caller::resolve(&registry(), &headers, "10.0.0.2".into());
        assert_eq!(caller.class, KeyClass::Anonymous);
        assert_eq!(caller.identity, "10.0.0.2");
    }
}
