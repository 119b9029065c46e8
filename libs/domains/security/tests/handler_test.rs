//! Handler and middleware tests for the security surface
//!
//! The full stack (rate-limit layer, key guards, `/security/*` routes) is
//! driven with `oneshot`; client addresses come from `X-Forwarded-For`.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use domain_security::*;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ADMIN_KEY: &str = "admin-key-0001";
const USER_KEY: &str = "user-key-0001";

async fn json_body(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn setup(quotas: Quotas) -> (Arc<ManualClock>, SecurityContext, Router) {
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_750_000_000)));
    let ctx = SecurityContext::new(
        Arc::new(ApiKeyRegistry::new(
            vec![ADMIN_KEY.to_string()],
            vec![USER_KEY.to_string()],
        )),
        Arc::new(RateLimiter::with_clock(quotas, clock.clone())),
        true,
    );

    let app = Router::new()
        .route("/search", get(|| async { "ok" }))
        .route("/health", get(|| async { "ok" }))
        .merge(handlers::router(ctx.clone()))
        .layer(from_fn_with_state(ctx.clone(), rate_limit_middleware));

    (clock, ctx, app)
}

fn request(method: &str, uri: &str, ip: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_admitted_responses_carry_rate_limit_headers() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    let response = app
        .oneshot(request("GET", "/search", "10.0.0.1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "60");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "59");
    assert!(response.headers().contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn test_quota_exhaustion_returns_429() {
    let (_clock, _ctx, app) = setup(Quotas {
        anonymous: 3,
        ..Quotas::default()
    });

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request("GET", "/search", "10.0.0.1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/search", "10.0.0.1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = json_body(response.into_body()).await;
    assert_eq!(body["error"], "RATE_LIMITED");
    assert_eq!(body["details"]["limit"], 3);
    assert_eq!(body["details"]["remaining"], 0);

    // another address is unaffected
    let response = app
        .oneshot(request("GET", "/search", "10.0.0.2", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_exempt_paths_are_not_counted() {
    let (_clock, ctx, app) = setup(Quotas {
        anonymous: 1,
        ..Quotas::default()
    });

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(request("GET", "/health", "10.0.0.1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(ctx.limiter.tracked(), 0);
}

#[tokio::test]
async fn test_keyed_callers_use_their_class_quota() {
    let (_clock, _ctx, app) = setup(Quotas {
        anonymous: 1,
        user: 2,
        admin: 3,
    });

    let response = app
        .clone()
        .oneshot(request("GET", "/search", "10.0.0.1", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(response.headers()["x-ratelimit-limit"], "3");

    // a key-guarded route counts against the same class quota
    let response = app
        .clone()
        .oneshot(request("POST", "/security/api-key/validate", "10.0.0.1", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "3");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "1");

    let response = app
        .oneshot(request("POST", "/security/api-key/validate", "10.0.0.2", Some(USER_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
}

#[tokio::test]
async fn test_window_recovers_after_clock_advances() {
    let (clock, _ctx, app) = setup(Quotas {
        anonymous: 1,
        ..Quotas::default()
    });

    app.clone()
        .oneshot(request("GET", "/search", "10.0.0.1", None))
        .await
        .unwrap();
    let blocked = app
        .clone()
        .oneshot(request("GET", "/search", "10.0.0.1", None))
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    clock.advance(Duration::from_secs(61));
    let response = app
        .oneshot(request("GET", "/search", "10.0.0.1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_require_admin_key() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    let missing = app
        .clone()
        .oneshot(request("GET", "/security/rate-limit/stats", "10.0.0.1", None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.headers()[header::WWW_AUTHENTICATE], "ApiKey");

    let invalid = app
        .clone()
        .oneshot(request("GET", "/security/rate-limit/stats", "10.0.0.1", Some("nope")))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

    let user = app
        .clone()
        .oneshot(request("GET", "/security/rate-limit/stats", "10.0.0.1", Some(USER_KEY)))
        .await
        .unwrap();
    assert_eq!(user.status(), StatusCode::FORBIDDEN);

    let admin = app
        .oneshot(request("GET", "/security/rate-limit/stats", "10.0.0.1", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);

    let body = json_body(admin.into_body()).await;
    assert_eq!(body["limits"]["default"], 60);
    assert!(body["tracked_ips"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_reset_clears_windows() {
    let (_clock, ctx, app) = setup(Quotas::default());

    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        app.clone()
            .oneshot(request("GET", "/search", ip, None))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(request("POST", "/security/rate-limit/reset", "10.0.0.4", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // three anonymous windows plus the admin's own
    let body = json_body(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Rate limits reset for 4 tracked clients");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(ctx.limiter.tracked(), 0);
}

#[tokio::test]
async fn test_validate_api_key() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    let user = app
        .clone()
        .oneshot(request("POST", "/security/api-key/validate", "10.0.0.1", Some(USER_KEY)))
        .await
        .unwrap();
    assert_eq!(user.status(), StatusCode::OK);
    let body = json_body(user.into_body()).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["key_type"], "user");
    assert_eq!(body["message"], "Valid user API key");

    let admin = app
        .clone()
        .oneshot(request("POST", "/security/api-key/validate", "10.0.0.1", Some(ADMIN_KEY)))
        .await
        .unwrap();
    let body = json_body(admin.into_body()).await;
    assert_eq!(body["key_type"], "admin");

    let missing = app
        .oneshot(request("POST", "/security/api-key/validate", "10.0.0.1", None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(missing.into_body()).await;
    assert_eq!(body["message"], "API key required");
}

#[tokio::test]
async fn test_check_peeks_after_layer_counts_request() {
    let (_clock, _ctx, app) = setup(Quotas {
        anonymous: 10,
        ..Quotas::default()
    });

    // the check request itself passes the rate-limit layer once
    let response = app
        .clone()
        .oneshot(request("GET", "/security/rate-limit/check", "10.0.0.1", None))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["remaining"], 9);
    assert_eq!(body["client_ip"], "10.0.0.1");

    let response = app
        .oneshot(request("GET", "/security/rate-limit/check", "10.0.0.1", None))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["remaining"], 8);
}

#[tokio::test]
async fn test_security_info() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    let response = app
        .oneshot(request("GET", "/security/info", "10.0.0.1", None))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;

    assert_eq!(body["rate_limiting_enabled"], true);
    assert_eq!(body["api_key_auth_enabled"], true);
    assert_eq!(body["admin_keys_count"], 1);
    assert_eq!(body["user_keys_count"], 1);
    assert_eq!(body["rate_limits"]["user"], 120);
    assert_eq!(body["security_headers_enabled"], true);
}

#[tokio::test]
async fn test_security_audit_is_admin_only() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    for ip in ["10.0.0.1", "10.0.0.2"] {
        app.clone()
            .oneshot(request("GET", "/search", ip, None))
            .await
            .unwrap();
    }

    let user = app
        .clone()
        .oneshot(request("GET", "/security/audit", "10.0.0.3", Some(USER_KEY)))
        .await
        .unwrap();
    assert_eq!(user.status(), StatusCode::FORBIDDEN);

    let admin = app
        .oneshot(request("GET", "/security/audit", "10.0.0.3", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);

    // two anonymous windows, the user's rejected request, and the admin's own
    let body = json_body(admin.into_body()).await;
    let features = &body["security_features"];
    assert_eq!(features["rate_limiting"]["enabled"], true);
    assert_eq!(features["rate_limiting"]["active_ips"], 4);
    assert_eq!(features["rate_limiting"]["total_requests"], 4);
    assert_eq!(features["api_key_auth"]["admin_keys"], 1);
    assert_eq!(features["api_key_auth"]["user_keys"], 1);
    assert!(!body["recommendations"].as_array().unwrap().is_empty());
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_security_headers_test_lists_expected_headers() {
    let (_clock, _ctx, app) = setup(Quotas::default());

    let response = app
        .oneshot(request("GET", "/security/headers/test", "10.0.0.7", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "59");

    let body = json_body(response.into_body()).await;
    assert_eq!(body["client_ip"], "10.0.0.7");
    let expected: Vec<&str> = body["expected_headers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h.as_str())
        .collect();
    assert!(expected.contains(&"x-content-type-options"));
    assert!(expected.contains(&"content-security-policy"));
    assert!(expected.contains(&"x-ratelimit-reset"));
}
