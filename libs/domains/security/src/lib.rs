//! API key authentication and per-caller admission control.
//!
//! - [`ApiKeyRegistry`]: admin and user keys loaded once at startup
//! - [`RateLimiter`]: sliding 60-second window with a quota per [`KeyClass`]
//! - [`middleware`]: the rate-limit layer and the `require_*_key` guards
//! - [`handlers`]: `/security/*` endpoints
//!
//! The limiter is process-local; running several instances multiplies the
//! effective quota by the instance count.

pub mod api_keys;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;

pub use api_keys::{ApiKeyRegistry, KeyClass, fingerprint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RateLimitConfig, SecurityConfig};
pub use error::SecurityError;
pub use handlers::ApiDoc;
pub use middleware::{
    Caller, SecurityContext, rate_limit_middleware, require_admin_key, require_api_key,
};
pub use models::{
    ApiKeyValidation, RateLimitCheck, RateLimitReset, SecurityAudit, SecurityHeadersTest,
    SecurityInfo,
};
pub use rate_limit::{Quotas, RateDecision, RateLimitInfo, RateLimitStats, RateLimiter};

