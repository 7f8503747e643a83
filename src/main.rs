//! SIWE Auth Server
//!
//! Serves Sign-In with Ethereum challenges and verifies signed messages,
//! optionally persisting nonces in PostgreSQL for replay prevention.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use siwe_auth_server::config::{Config, NonceStoreBackend};
use siwe_auth_server::nonce::{CleanupSweeper, InMemoryNonceStore, NonceStore, PgNonceStore};
use siwe_auth_server::state::AppState;
use siwe_auth_server::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        domain = config.siwe.domain(),
        prevent_replay = config.siwe.prevent_replay(),
        "Starting SIWE auth server"
    );

    let nonce_store = build_nonce_store(&config).await?;

    // Keep the scheduler alive for the lifetime of the server
    let _cleanup_scheduler = if config.siwe.prevent_replay() {
        let scheduler = CleanupSweeper::new(nonce_store.clone())
            .start(&config.nonce_cleanup_schedule)
            .await
            .context("Failed to start nonce cleanup job")?;
        Some(scheduler)
    } else {
        tracing::info!("Replay prevention disabled, nonce cleanup job not started");
        None
    };

    let app_state = AppState::new(config.siwe.clone(), nonce_store);

    let app = routes::create_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn build_nonce_store(config: &Config) -> anyhow::Result<Arc<dyn NonceStore>> {
    match config.nonce_store {
        NonceStoreBackend::Postgres => {
            let pool = db::create_pool(config).await?;
            db::run_migrations(&pool).await?;

            tracing::info!("Using PostgreSQL nonce store");
            Ok(Arc::new(PgNonceStore::new(pool, config.nonce_store_timeout)))
        }
        NonceStoreBackend::Memory => {
            if config.environment.is_production() {
                tracing::warn!("In-memory nonce store does not survive restarts or scale out");
            }

            tracing::info!("Using in-memory nonce store");
            Ok(Arc::new(InMemoryNonceStore::new()))
        }
    }
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.as_deref().unwrap_or_default();

    if allowed_origins_str.trim().is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
