//! Middleware for the SIWE auth server
//!
//! Request tracing and security headers.

mod security;
mod tracing;

pub use security::security_headers;
pub use self::tracing::request_tracing;
