use axum::{
    extract::Request,
    http::{
        HeaderValue,
        header::{self, HeaderName},
    },
    middleware::Next,
    response::Response,
};

const SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
    (
        HeaderName::from_static("permissions-policy"),
        "geolocation=(), microphone=(), camera=()",
    ),
];

/// Names of the headers added by [`security_headers`], lowercase
pub fn security_header_names() -> Vec<String> {
    SECURITY_HEADERS
        .iter()
        .map(|(name, _)| name.as_str().to_string())
        .collect()
}

/// Adds browser hardening headers to every response.
///
/// Headers already set by an inner handler are left untouched, so the
/// documentation UIs can relax the content security policy they need.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(name)
            .or_insert(HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_security_headers_applied() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(security_headers));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
        assert_eq!(
            headers["permissions-policy"],
            "geolocation=(), microphone=(), camera=()"
        );
    }

    #[test]
    fn test_header_names_listed() {
        let names = security_header_names();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "x-content-type-options");
        assert!(names.iter().any(|n| n == "permissions-policy"));
    }

    #[tokio::test]
    async fn test_existing_header_is_preserved() {
        let app = Router::new()
            .route(
                "/docs",
                get(|| async { ([(header::CONTENT_SECURITY_POLICY, "default-src *")], "docs") }),
            )
            .layer(middleware::from_fn(security_headers));

        let response = app
            .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_SECURITY_POLICY],
            "default-src *"
        );
    }
}
