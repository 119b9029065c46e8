use redis::aio::ConnectionManager;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::common::DatabaseError;

/// `PING` the server, expecting `PONG`
pub async fn check_health(conn: &mut ConnectionManager) -> Result<(), DatabaseError> {
    let response: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("Redis PING failed: {}", e)))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis PING returned unexpected response: {}",
            response
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}

/// Outcome of a timed health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            message: None,
            response_time_ms,
        }
    }

    pub fn unhealthy(message: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            response_time_ms,
        }
    }
}

/// [`check_health`] with timing, never failing
pub async fn check_health_detailed(conn: &mut ConnectionManager) -> HealthStatus {
    let start = Instant::now();
    let result = check_health(conn).await;
    let elapsed = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus::healthy(elapsed),
        Err(e) => HealthStatus::unhealthy(e.to_string(), elapsed),
    }
}
