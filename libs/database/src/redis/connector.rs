use redis::Client;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info};

use super::RedisConfig;
use crate::common::{RetryPolicy, retry_with_policy};

/// Open a [`ConnectionManager`] and verify it with `PING`.
///
/// `timeout` bounds the connect and the verification `PING` separately.
pub async fn connect(url: &str, timeout: Duration) -> redis::RedisResult<ConnectionManager> {
    debug!("Connecting to Redis");

    let client = Client::open(url)?;
    let manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| timed_out("connect"))??;

    let mut conn = manager.clone();
    let _pong = tokio::time::timeout(timeout, redis::cmd("PING").query_async::<String>(&mut conn))
        .await
        .map_err(|_| timed_out("PING"))??;

    info!("Connected to Redis");
    Ok(manager)
}

fn timed_out(stage: &str) -> redis::RedisError {
    std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("Redis {stage} timed out"),
    )
    .into()
}

/// Connect using a [`RedisConfig`]
pub async fn connect_from_config(
    config: &RedisConfig,
    timeout: Duration,
) -> redis::RedisResult<ConnectionManager> {
    connect(&config.url(), timeout).await
}

/// Connect with backoff, for startup paths that prefer to wait for Redis
pub async fn connect_with_retry(
    config: &RedisConfig,
    timeout: Duration,
    policy: RetryPolicy,
) -> redis::RedisResult<ConnectionManager> {
    let url = config.url();
    retry_with_policy(|| connect(&url, timeout), policy).await
}
