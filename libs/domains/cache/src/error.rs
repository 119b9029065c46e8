use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend answered with an error
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation '{0}' timed out")]
    Timeout(&'static str),

    /// The backend is known to be down; the call was not attempted
    #[error("Cache backend is not connected")]
    Unavailable,

    #[error("Cache payload serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid cache pattern '{0}'")]
    InvalidPattern(String),

    /// An upstream collaborator (embedding provider, vector index) failed
    #[error("Upstream error: {0}")]
    Upstream(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable => {
                AppError::ServiceUnavailable("Cache backend is not connected".to_string())
            }
            CacheError::Timeout(op) => {
                AppError::ServiceUnavailable(format!("Cache operation '{}' timed out", op))
            }
            CacheError::Backend(msg) => AppError::InternalServerError(format!("Cache error: {}", msg)),
            CacheError::Serialization(msg) => AppError::InternalServerError(msg),
            CacheError::InvalidPattern(pattern) => AppError::BadRequest(format!(
                "Invalid pattern '{}': use a tier name such as 'embedding', 'search' or 'vector'",
                pattern
            )),
            CacheError::Upstream(msg) => AppError::BadGateway(msg),
        }
    }
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CacheError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Timeout("clear"), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Backend("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::InvalidPattern("*".into()), StatusCode::BAD_REQUEST),
            (CacheError::Upstream("index down".into()), StatusCode::BAD_GATEWAY),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }
}
