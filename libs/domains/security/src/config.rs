use core_config::{ConfigError, FromEnv, env_list, env_parse};

use crate::rate_limit::Quotas;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub quotas: Quotas,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quotas: Quotas::default(),
        }
    }
}

impl FromEnv for RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Quotas::default();

        Ok(Self {
            enabled: env_parse("RATE_LIMIT_ENABLED", true)?,
            quotas: Quotas {
                anonymous: env_parse("RATE_LIMIT_DEFAULT", defaults.anonymous)?,
                user: env_parse("RATE_LIMIT_USER", defaults.user)?,
                admin: env_parse("RATE_LIMIT_ADMIN", defaults.admin)?,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityConfig {
    pub rate_limit: RateLimitConfig,
    /// From `ADMIN_API_KEYS` (comma-separated)
    pub admin_keys: Vec<String>,
    /// From `USER_API_KEYS` (comma-separated)
    pub user_keys: Vec<String>,
}

impl FromEnv for SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rate_limit: RateLimitConfig::from_env()?,
            admin_keys: env_list("ADMIN_API_KEYS"),
            user_keys: env_list("USER_API_KEYS"),
        })
    }
}
