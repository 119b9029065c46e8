//! Redis connectivity shared by the cache backend and the health endpoints.
//!
//! # Features
//!
//! - `redis` (default) - Redis connector, config and health checks
//! - `config` - `core_config::FromEnv` support for [`redis::RedisConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::redis::{RedisConfig, connect_from_config};
//!
//! let config = RedisConfig::new("127.0.0.1", 6379);
//! let manager = connect_from_config(&config).await?;
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
