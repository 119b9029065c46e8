//! Sliding-window rate limiter.
//!
//! Each identifier owns the instants of its requests within the trailing
//! [`WINDOW`]. A check first drops instants older than the window, then
//! rejects without recording when the remaining count has reached the quota,
//! otherwise records `now` and admits. Capacity is therefore exact over any
//! trailing 60 seconds.
//!
//! State is process-local: every instance of the service counts separately
//! and a restart forgets all windows.

use observability::SecurityMetrics;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::api_keys::KeyClass;
use crate::clock::{Clock, SystemClock};

pub const WINDOW: Duration = Duration::from_secs(60);

/// Requests per minute for each caller class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Quotas {
    #[serde(rename = "default")]
    pub anonymous: u32,
    pub user: u32,
    pub admin: u32,
}

impl Quotas {
    pub fn for_class(&self, class: KeyClass) -> u32 {
        match class {
            KeyClass::Anonymous => self.anonymous,
            KeyClass::User => self.user,
            KeyClass::Admin => self.admin,
        }
    }
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            anonymous: 60,
            user: 120,
            admin: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which capacity next frees up
    pub reset: u64,
    /// Requests counted in the current window
    pub current: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub info: RateLimitInfo,
}

impl RateDecision {
    /// Whole seconds until `reset`, at least one
    pub fn retry_after(&self, now: Duration) -> u64 {
        self.info.reset.saturating_sub(now.as_secs()).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RateLimitStats {
    /// Identifiers with at least one request in the window
    pub active_ips: usize,
    pub total_requests_last_minute: usize,
    /// Identifiers held in the table after eviction
    pub tracked_ips: usize,
    pub limits: Quotas,
}

type Windows = HashMap<String, VecDeque<Duration>>;

pub struct RateLimiter {
    windows: Mutex<Windows>,
    quotas: Quotas,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(quotas: Quotas) -> Self {
        Self::with_clock(quotas, Arc::new(SystemClock))
    }

    pub fn with_clock(quotas: Quotas, clock: Arc<dyn Clock>) -> Self {
        info!(
            default_rpm = quotas.anonymous,
            user_rpm = quotas.user,
            admin_rpm = quotas.admin,
            "Rate limiter initialized"
        );
        Self {
            windows: Mutex::new(HashMap::new()),
            quotas,
            clock,
        }
    }

    pub fn quotas(&self) -> &Quotas {
        &self.quotas
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or reject one request from `identifier`, recording it when admitted
    pub fn check(&self, identifier: &str, class: KeyClass) -> RateDecision {
        let decision = self.evaluate(identifier, class, true);
        SecurityMetrics::record_decision(class.as_str(), decision.allowed);

        if !decision.allowed {
            debug!(
                identifier,
                class = %class,
                limit = decision.info.limit,
                current = decision.info.current,
                "Rate limit exceeded"
            );
        }
        decision
    }

    /// What [`check`](Self::check) would decide, without recording anything
    pub fn peek(&self, identifier: &str, class: KeyClass) -> RateDecision {
        self.evaluate(identifier, class, false)
    }

    fn evaluate(&self, identifier: &str, class: KeyClass, record: bool) -> RateDecision {
        let now = self.clock.now();
        let window_start = now.saturating_sub(WINDOW);
        let limit = self.quotas.for_class(class);

        let mut windows = self.lock();
        let tracked = windows.len();

        let (current, oldest) = match windows.get_mut(identifier) {
            Some(window) => {
                purge(window, window_start);
                (window.len() as u32, window.front().copied())
            }
            None => (0, None),
        };
        if current == 0 {
            windows.remove(identifier);
        }

        let decision = if current >= limit {
            RateDecision {
                allowed: false,
                info: RateLimitInfo {
                    limit,
                    remaining: 0,
                    reset: (oldest.unwrap_or(now) + WINDOW).as_secs(),
                    current,
                },
            }
        } else {
            if record {
                windows
                    .entry(identifier.to_string())
                    .or_default()
                    .push_back(now);
            }
            let counted = current + u32::from(record);
            RateDecision {
                allowed: true,
                info: RateLimitInfo {
                    limit,
                    remaining: limit - counted,
                    reset: (now + WINDOW).as_secs(),
                    current: counted,
                },
            }
        };

        if windows.len() != tracked {
            SecurityMetrics::set_tracked_identifiers(windows.len());
        }
        decision
    }

    /// Purges every window and evicts identifiers left with none in the window
    pub fn stats(&self) -> RateLimitStats {
        let window_start = self.clock.now().saturating_sub(WINDOW);
        let mut windows = self.lock();

        windows.retain(|_, window| {
            purge(window, window_start);
            !window.is_empty()
        });
        SecurityMetrics::set_tracked_identifiers(windows.len());

        RateLimitStats {
            active_ips: windows.len(),
            total_requests_last_minute: windows.values().map(VecDeque::len).sum(),
            tracked_ips: windows.len(),
            limits: self.quotas,
        }
    }

    /// Forget every window, returning how many identifiers were tracked
    pub fn reset(&self) -> usize {
        let mut windows = self.lock();
        let cleared = windows.len();
        windows.clear();
        drop(windows);

        SecurityMetrics::set_tracked_identifiers(0);
        info!(cleared, "Rate limits reset");
        cleared
    }

    pub fn tracked(&self) -> usize {
        self.lock().len()
    }
}

fn purge(window: &mut VecDeque<Duration>, window_start: Duration) {
    while window.front().is_some_and(|&at| at < window_start) {
        window.pop_front();
    }
}
