use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api_keys::KeyClass;
use crate::rate_limit::Quotas;

/// Public summary of the security configuration; never includes keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityInfo {
    pub rate_limiting_enabled: bool,
    pub api_key_auth_enabled: bool,
    pub admin_keys_count: usize,
    pub user_keys_count: usize,
    pub rate_limits: Quotas,
    pub security_headers_enabled: bool,
}

/// Non-mutating view of the caller's current window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitCheck {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds
    pub reset: u64,
    pub client_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitReset {
    #[schema(example = "success")]
    pub status: String,
    #[schema(example = "Rate limits reset for 12 tracked clients")]
    pub message: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyValidation {
    pub valid: bool,
    pub key_type: Option<KeyClass>,
    #[schema(example = "Valid user API key")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitingStatus {
    pub enabled: bool,
    pub active_ips: usize,
    pub total_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyAuthStatus {
    pub enabled: bool,
    pub admin_keys: usize,
    pub user_keys: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityFeatures {
    pub rate_limiting: RateLimitingStatus,
    pub api_key_auth: ApiKeyAuthStatus,
    pub security_headers_enabled: bool,
    pub structured_logging: bool,
}

/// Admin view of the live security posture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityAudit {
    /// RFC 3339, UTC
    pub timestamp: String,
    pub security_features: SecurityFeatures,
    pub recommendations: Vec<String>,
}

/// Echo of the caller with the headers its response should carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityHeadersTest {
    pub client_ip: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub expected_headers: Vec<String>,
}
