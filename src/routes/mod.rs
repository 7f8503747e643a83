//! Route definitions for the SIWE auth server

mod auth;

use axum::{routing::get, Router};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

pub use auth::auth_routes;

/// Build the application router with its middleware stack
///
/// CORS is left to the caller since allowed origins come from deployment
/// configuration.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
