/// Errors raised while connecting to or probing a backing store
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection could not be established (after retries, if any)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for connector operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
