#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

/// Redis connection settings for the cache backend.
///
/// Either a full `url` is given, or one is assembled from host/port/database
/// and optional credentials.
///
/// # Example
///
/// ```ignore
/// use database::redis::RedisConfig;
///
/// let config = RedisConfig::new("redis", 6379).with_password("s3cret");
/// assert_eq!(config.url(), "redis://:s3cret@redis:6379/0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisConfig {
    /// Explicit connection URL; overrides host/port/database/credentials
    pub url: Option<String>,

    pub host: String,

    pub port: u16,

    /// Logical database number (0-15 for default Redis)
    pub database: u8,

    /// Optional username for Redis ACL
    pub username: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            url: None,
            host: host.into(),
            port,
            database: 0,
            username: None,
            password: None,
        }
    }

    /// Use a pre-built connection URL as-is
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Connection URL including credentials and database
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (None, Some(pass)) => format!(":{}@", pass),
            (Some(user), None) => format!("{}@", user),
            (None, None) => String::new(),
        };

        format!(
            "redis://{}{}:{}/{}",
            auth, self.host, self.port, self.database
        )
    }

    /// URL safe for logging (password masked)
    pub fn redacted_url(&self) -> String {
        match &self.password {
            Some(pass) if !pass.is_empty() => self.url().replace(pass.as_str(), "****"),
            _ => self.url(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 6379)
    }
}

/// Load RedisConfig from environment variables
///
/// - `REDIS_URL` (optional) - full connection string, takes precedence
/// - `REDIS_HOST` (default `redis`)
/// - `REDIS_PORT` (default `6379`)
/// - `REDIS_DB` (default `0`)
/// - `REDIS_USERNAME` / `REDIS_PASSWORD` (optional, empty means unset)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Ok(Self {
            url: non_empty("REDIS_URL"),
            host: env_or_default("REDIS_HOST", "redis"),
            port: env_parse("REDIS_PORT", 6379u16)?,
            database: env_parse("REDIS_DB", 0u8)?,
            username: non_empty("REDIS_USERNAME"),
            password: non_empty("REDIS_PASSWORD"),
        })
    }
}
