//! # Axum Helpers
//!
//! Shared HTTP plumbing for the search services.
//!
//! - **[`server`]**: router assembly with API docs, health/readiness, graceful shutdown
//! - **[`http`]**: security headers middleware and the [`ClientIp`] extractor
//! - **[`errors`]**: [`AppError`] and the JSON [`ErrorResponse`] with [`ErrorCode`]s
//! - **[`audit`]**: structured audit events on the `audit` target

pub mod audit;
pub mod errors;
pub mod http;
pub mod server;

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::{ClientIp, resolve_client_ip, security_header_names, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use audit::{AuditActor, AuditEvent, AuditOutcome, extract_user_agent};
