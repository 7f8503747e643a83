//! Sign-In with Ethereum auth server
//!
//! Issues EIP-4361 challenges and verifies the signed messages wallets send
//! back, with optional nonce persistence for replay prevention.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod nonce;
pub mod routes;
pub mod state;
