//! API handlers for the SIWE auth server

pub mod auth;
pub mod health;

pub use auth::*;
pub use health::health_check;
