//! Admission control and API key metrics.

use metrics::{counter, gauge};

pub struct SecurityMetrics;

impl SecurityMetrics {
    /// One rate limiter decision for a caller class (`anonymous`, `user`, `admin`)
    pub fn record_decision(class: &'static str, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "rejected" };
        counter!("rate_limit_decisions_total", "class" => class, "outcome" => outcome)
            .increment(1);
    }

    /// `reason` is `missing`, `invalid` or `insufficient`
    pub fn record_key_rejection(reason: &'static str) {
        counter!("api_key_rejections_total", "reason" => reason).increment(1);
    }

    pub fn set_tracked_identifiers(count: usize) {
        gauge!("rate_limit_tracked_identifiers").set(count as f64);
    }
}
