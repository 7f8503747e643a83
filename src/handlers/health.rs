//! Health check handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::models::HealthResponse;
use crate::nonce::NonceStore;

/// GET /health - Report nonce store reachability
pub async fn health_check(
    State(nonce_store): State<Arc<dyn NonceStore>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, store_status) = match nonce_store.check_health().await {
        Ok(()) => (StatusCode::OK, "connected".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Nonce store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, format!("error: {}", e))
        }
    };

    let body = HealthResponse {
        status: if status.is_success() { "healthy" } else { "unhealthy" }.to_string(),
        nonce_store: store_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status, Json(body))
}
