pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Body of every error response.
///
/// ```json
/// {
///   "code": 1013,
///   "error": "RATE_LIMITED",
///   "message": "Rate limit exceeded: 60 requests per minute",
///   "details": {"retry_after": 42}
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error type shared by every handler; converts into a JSON [`ErrorResponse`].
///
/// Domain crates map their own errors into these variants.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON parsing error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Query extraction error: {0}")]
    QueryRejection(#[from] QueryRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Rendered with `WWW-Authenticate: ApiKey`
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// Rendered with `Retry-After: {retry_after}`; `details` default to `{"retry_after": n}`
    #[error("Too Many Requests: {message}")]
    TooManyRequests {
        message: String,
        retry_after: u64,
        details: Option<serde_json::Value>,
    },

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SerdeJson(_) | AppError::Io(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::JsonExtractorRejection(e) => e.status(),
            AppError::QueryRejection(e) => e.status(),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::SerdeJson(_) => ErrorCode::SerdeJsonError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::JsonExtractorRejection(_) => ErrorCode::JsonExtraction,
            AppError::QueryRejection(_) => ErrorCode::InvalidQuery,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::TooManyRequests { .. } => ErrorCode::RateLimited,
            AppError::InternalServerError(_) => ErrorCode::InternalError,
            AppError::BadGateway(_) => ErrorCode::BadGateway,
            AppError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();
        let mut retry_after = None;
        let mut details = None;

        let message = match self {
            AppError::SerdeJson(e) => {
                tracing::error!(error_code = code.code(), "JSON parsing error: {:?}", e);
                code.default_message().to_string()
            }
            AppError::Io(e) => {
                tracing::error!(error_code = code.code(), "I/O error: {:?}", e);
                code.default_message().to_string()
            }
            AppError::JsonExtractorRejection(e) => {
                tracing::warn!(error_code = code.code(), "JSON extraction error: {:?}", e);
                e.body_text()
            }
            AppError::QueryRejection(e) => {
                tracing::info!(error_code = code.code(), "Query extraction error: {:?}", e);
                e.body_text()
            }
            AppError::TooManyRequests {
                message,
                retry_after: secs,
                details: extra,
            } => {
                tracing::info!(error_code = code.code(), retry_after = secs, "{}", message);
                retry_after = Some(secs);
                details = Some(extra.unwrap_or_else(|| serde_json::json!({ "retry_after": secs })));
                message
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error_code = code.code(), "Internal server error: {}", msg);
                msg
            }
            AppError::BadGateway(msg) => {
                tracing::error!(error_code = code.code(), "Upstream error: {}", msg);
                msg
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!(error_code = code.code(), "Service unavailable: {}", msg);
                msg
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => {
                tracing::info!(error_code = code.code(), "{}: {}", code, msg);
                msg
            }
        };

        let mut response = error_response_with_details(status, message, code, details);
        let headers = response.headers_mut();

        if status == StatusCode::UNAUTHORIZED {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
        }
        if let Some(secs) = retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Build a JSON error response without going through [`AppError`]
pub fn error_response(status: StatusCode, message: String, error_code: ErrorCode) -> Response {
    error_response_with_details(status, message, error_code, None)
}

fn error_response_with_details(
    status: StatusCode,
    message: String,
    error_code: ErrorCode,
    details: Option<serde_json::Value>,
) -> Response {
    let body = Json(ErrorResponse {
        code: error_code.code(),
        error: error_code.as_str().to_string(),
        message,
        details,
    });

    (status, body).into_response()
}
