use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::rate_limit::RateLimitInfo;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("{0}")]
    MissingApiKey(&'static str),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Admin privileges required")]
    AdminRequired,

    #[error("Rate limit exceeded: {} requests per minute", .info.limit)]
    RateLimited {
        info: RateLimitInfo,
        retry_after: u64,
    },
}

impl SecurityError {
    /// Label for the `api_key_rejections_total` metric
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            SecurityError::MissingApiKey(_) => Some("missing"),
            SecurityError::InvalidApiKey => Some("invalid"),
            SecurityError::AdminRequired => Some("insufficient"),
            SecurityError::RateLimited { .. } => None,
        }
    }
}

impl From<SecurityError> for AppError {
    fn from(err: SecurityError) -> Self {
        let message = err.to_string();
        match err {
            SecurityError::MissingApiKey(_) | SecurityError::InvalidApiKey => {
                AppError::Unauthorized(message)
            }
            SecurityError::AdminRequired => AppError::Forbidden(message),
            SecurityError::RateLimited { info, retry_after } => AppError::TooManyRequests {
                message,
                retry_after,
                details: Some(serde_json::json!({
                    "limit": info.limit,
                    "remaining": info.remaining,
                    "reset": info.reset,
                    "retry_after": retry_after,
                })),
            },
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let limits = match &self {
            SecurityError::RateLimited { info, .. } => Some(*info),
            _ => None,
        };

        let app_error: AppError = self.into();
        let mut response = app_error.into_response();

        if let Some(info) = limits {
            set_rate_limit_headers(response.headers_mut(), &info);
        }
        response
    }
}

pub const RATE_LIMIT_HEADERS: [&str; 3] =
    ["x-ratelimit-limit", "x-ratelimit-remaining", "x-ratelimit-reset"];

/// `X-RateLimit-Limit`, `X-RateLimit-Remaining`, `X-RateLimit-Reset`
pub fn set_rate_limit_headers(headers: &mut axum::http::HeaderMap, info: &RateLimitInfo) {
    let [limit, remaining, reset] = RATE_LIMIT_HEADERS;
    headers.insert(limit, HeaderValue::from(info.limit));
    headers.insert(remaining, HeaderValue::from(info.remaining));
    headers.insert(reset, HeaderValue::from(info.reset));
}
