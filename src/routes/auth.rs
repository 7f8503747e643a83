//! Authentication routes

use axum::{routing::post, Router};

use crate::handlers::auth;
use crate::state::AppState;

/// Create Sign-In with Ethereum routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/siwe/challenge", post(auth::request_challenge))
        .route("/auth/siwe/verify", post(auth::verify_message))
}
