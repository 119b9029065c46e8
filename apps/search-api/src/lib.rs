//! # Catalog search API
//!
//! Composition root for the search backend's cache and admission layers.
//! Everything stateful (cache backend, rate limiter, key registry) is built
//! once in [`AppState::new`] and handed to the routers that need it.
//!
//! ```text
//! request
//!   -> metrics_middleware
//!   -> rate_limit_middleware      (X-RateLimit-*, 429)
//!   -> require_admin_key          (/cache/clear, /security/rate-limit/*)
//!   -> domain_cache / domain_security handlers
//! ```

pub mod api;
pub mod config;
pub mod openapi;
pub mod state;

pub use config::Config;
pub use state::AppState;
