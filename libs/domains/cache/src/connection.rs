//! Connection state machine for the cache backend.
//!
//! ```text
//! Disconnected ──probe──▶ Probing ──ok──▶ Connected
//!      ▲                     │                │
//!      └───────fail──────────┘◀──stale/fail───┘
//! ```
//!
//! A verdict is trusted for the revalidation interval; after that the next
//! caller probes while the others keep the last settled verdict.

use observability::CacheMetrics;
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Probing,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Probing => "probing",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// What a caller should do before touching the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Backend believed up, call it
    Proceed,
    /// Verdict is stale, this caller must probe
    Probe,
    /// Backend believed down (or being probed after a failure), skip it
    ShortCircuit,
}

#[derive(Debug)]
struct Inner {
    state: ConnectionState,
    /// Last verdict that was not `Probing`; `None` before the first probe
    settled: Option<bool>,
    checked_at: Option<Instant>,
    probe_started: Option<Instant>,
}

#[derive(Debug)]
pub struct ConnectionMonitor {
    inner: Mutex<Inner>,
    revalidate_interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(revalidate_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                settled: None,
                checked_at: None,
                probe_started: None,
            }),
            revalidate_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn admit(&self) -> Admission {
        let mut inner = self.lock();
        let now = Instant::now();
        let fresh = |at: Option<Instant>| {
            at.is_some_and(|at| now.duration_since(at) < self.revalidate_interval)
        };

        let state = inner.state;
        match state {
            ConnectionState::Connected if fresh(inner.checked_at) => Admission::Proceed,
            ConnectionState::Disconnected if fresh(inner.checked_at) => Admission::ShortCircuit,
            // a probe abandoned by a cancelled request must not wedge the monitor
            ConnectionState::Probing if fresh(inner.probe_started) => {
                if inner.settled == Some(true) {
                    Admission::Proceed
                } else {
                    Admission::ShortCircuit
                }
            }
            _ => {
                inner.state = ConnectionState::Probing;
                inner.probe_started = Some(now);
                Admission::Probe
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        let previous = inner.settled;

        inner.state = ConnectionState::Connected;
        inner.settled = Some(true);
        inner.checked_at = Some(Instant::now());
        inner.probe_started = None;
        drop(inner);

        if previous != Some(true) {
            match previous {
                Some(false) => info!("Cache backend reconnected, caching re-enabled"),
                _ => info!("Cache backend connected"),
            }
            CacheMetrics::set_connected(true);
        }
    }

    pub fn record_failure(&self, operation: &str, error: &dyn fmt::Display) {
        let mut inner = self.lock();
        let previous = inner.settled;

        inner.state = ConnectionState::Disconnected;
        inner.settled = Some(false);
        inner.checked_at = Some(Instant::now());
        inner.probe_started = None;
        drop(inner);

        if previous == Some(false) {
            debug!(operation, error = %error, "Cache backend still unavailable");
        } else {
            warn!(operation, error = %error, "Cache backend unavailable, caching disabled");
            CacheMetrics::set_connected(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn test_first_caller_probes() {
        let monitor = ConnectionMonitor::new(INTERVAL);
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        assert_eq!(monitor.admit(), Admission::Probe);
        assert_eq!(monitor.state(), ConnectionState::Probing);
        // nothing settled yet, so concurrent callers skip the backend
        assert_eq!(monitor.admit(), Admission::ShortCircuit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_verdict_is_trusted_until_stale() {
        let monitor = ConnectionMonitor::new(INTERVAL);
        monitor.admit();
        monitor.record_success();

        assert_eq!(monitor.admit(), Admission::Proceed);

        tokio::time::advance(INTERVAL).await;
        assert_eq!(monitor.admit(), Admission::Probe);
        // probing after a healthy verdict does not block other callers
        assert_eq!(monitor.admit(), Admission::Proceed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_short_circuits_until_revalidation() {
        let monitor = ConnectionMonitor::new(INTERVAL);
        monitor.admit();
        monitor.record_success();
        monitor.record_failure("get", &"connection reset");

        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(monitor.admit(), Admission::ShortCircuit);

        tokio::time::advance(INTERVAL).await;
        assert_eq!(monitor.admit(), Admission::Probe);
        monitor.record_success();
        assert_eq!(monitor.state(), ConnectionState::Connected);
        assert_eq!(monitor.admit(), Admission::Proceed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_is_retried() {
        let monitor = ConnectionMonitor::new(INTERVAL);
        assert_eq!(monitor.admit(), Admission::Probe);

        tokio::time::advance(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(monitor.admit(), Admission::Probe);
    }
}
