//! Data models for the SIWE auth server

use serde::Serialize;

pub mod auth;
pub use auth::*;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub nonce_store: String,
    pub version: String,
}
