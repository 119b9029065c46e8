//! HTTP-level middleware and extractors.
//!
//! - Security headers on every response
//! - Client IP resolution honouring proxy headers

pub mod client_ip;
pub mod security;

pub use client_ip::{ClientIp, resolve_client_ip};
pub use security::{security_header_names, security_headers};
