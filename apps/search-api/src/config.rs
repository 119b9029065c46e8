use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::redis::RedisConfig;
use domain_cache::CacheConfig;
use domain_security::SecurityConfig;

pub use core_config::Environment;

/// Everything the search API reads from the environment
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            security: SecurityConfig::from_env()?,
            environment: Environment::from_env(),
        })
    }
}
