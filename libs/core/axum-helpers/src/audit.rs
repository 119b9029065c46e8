//! Audit trail for privileged and security-relevant actions.
//!
//! Events are emitted on the `audit` tracing target so they can be routed
//! separately from application logs.
//!
//! ```ignore
//! use axum_helpers::audit::{AuditEvent, AuditOutcome};
//!
//! AuditEvent::new("cache.clear", AuditOutcome::Success)
//!     .with_actor(Some("admin:3f2a9c1e".to_string()))
//!     .with_resource(Some("hsai:search:*".to_string()))
//!     .with_client_ip(Some(client_ip.to_string()))
//!     .with_details(json!({"keys_deleted": 12}))
//!     .log();
//! ```

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    /// Attempted but failed (e.g. backend error)
    Failure,
    /// Rejected by an authorization or quota check
    Denied,
}

/// Request extension naming the authenticated caller, set by auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditActor(pub String);

#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Dotted action name, e.g. `cache.clear` or `rate_limit.reset`
    pub action: String,
    pub outcome: AuditOutcome,
    /// Who acted: a key class plus fingerprint, never a raw key
    pub actor: Option<String>,
    /// What was acted on, e.g. a key pattern
    pub resource: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>, outcome: AuditOutcome) -> Self {
        Self {
            action: action.into(),
            outcome,
            actor: None,
            resource: None,
            client_ip: None,
            user_agent: None,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_resource(mut self, resource: Option<String>) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_client_ip(mut self, ip: Option<String>) -> Self {
        self.client_ip = ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Attach arbitrary structured details; unserializable values are dropped
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Emit on the `audit` target
    pub fn log(self) {
        let payload = serde_json::to_string(&self)
            .unwrap_or_else(|_| "unserializable audit event".to_string());

        match self.outcome {
            AuditOutcome::Success => tracing::info!(
                target: "audit",
                action = %self.action,
                outcome = ?self.outcome,
                actor = self.actor,
                resource = self.resource,
                ip = self.client_ip,
                "{}",
                payload
            ),
            AuditOutcome::Failure | AuditOutcome::Denied => tracing::warn!(
                target: "audit",
                action = %self.action,
                outcome = ?self.outcome,
                actor = self.actor,
                resource = self.resource,
                ip = self.client_ip,
                "{}",
                payload
            ),
        }
    }
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::new("rate_limit.reset", AuditOutcome::Success)
            .with_actor(Some("admin:ab12cd34".into()))
            .with_details(serde_json::json!({"cleared_entries": 3}));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "rate_limit.reset");
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["actor"], "admin:ab12cd34");
        assert_eq!(json["details"]["cleared_entries"], 3);
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_log_does_not_panic_without_subscriber() {
        AuditEvent::new("cache.clear", AuditOutcome::Denied).log();
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_agent(&headers), None);

        headers.insert("user-agent", HeaderValue::from_static("curl/8.5.0"));
        assert_eq!(extract_user_agent(&headers).as_deref(), Some("curl/8.5.0"));
    }
}
