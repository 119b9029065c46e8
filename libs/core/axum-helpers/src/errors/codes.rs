//! Error codes carried by every [`ErrorResponse`](super::ErrorResponse).
//!
//! Each code has a SCREAMING_SNAKE_CASE identifier for clients, an integer
//! for logs and dashboards, and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::RateLimited;
//! assert_eq!(code.as_str(), "RATE_LIMITED");
//! assert_eq!(code.code(), 1013);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Malformed query string
    InvalidQuery,

    NotFound,

    /// API key missing or not recognised
    Unauthorized,

    /// API key recognised but lacks the required privilege
    Forbidden,

    BadRequest,

    /// Caller exceeded its request quota for the current window
    RateLimited,

    JsonExtraction,

    // Server errors (1000s)
    InternalError,

    /// A dependency (cache, upstream) is temporarily unavailable
    ServiceUnavailable,

    /// An upstream service returned an error
    BadGateway,

    // I/O errors (4000s)
    IoError,

    // Serialization errors (5000s)
    SerdeJsonError,
}

impl ErrorCode {
    /// Client-facing identifier, e.g. `RATE_LIMITED`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "INVALID_QUERY",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest => "BAD_REQUEST",
            Self::RateLimited => "RATE_LIMITED",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BadGateway => "BAD_GATEWAY",
            Self::IoError => "IO_ERROR",
            Self::SerdeJsonError => "SERDE_JSON_ERROR",
        }
    }

    /// Integer code for structured logs and metrics.
    ///
    /// - 1000-1999: request and service errors
    /// - 4000-4999: I/O errors
    /// - 5000-5999: serialization errors
    pub fn code(&self) -> i32 {
        match self {
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::Unauthorized => 1006,
            Self::Forbidden => 1007,
            Self::ServiceUnavailable => 1011,
            Self::BadRequest => 1012,
            Self::RateLimited => 1013,
            Self::InvalidQuery => 1014,
            Self::BadGateway => 1015,
            Self::IoError => 4001,
            Self::SerdeJsonError => 5001,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "Invalid query parameters",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "A valid API key is required",
            Self::Forbidden => "Admin API key required",
            Self::BadRequest => "Bad request",
            Self::RateLimited => "Rate limit exceeded",
            Self::JsonExtraction => "Failed to parse request body",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::BadGateway => "Upstream service error",
            Self::IoError => "I/O error occurred",
            Self::SerdeJsonError => "JSON serialization error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
