//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{ChallengeService, VerificationService};
use crate::config::SiweOptions;
use crate::nonce::NonceStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub challenge_service: Arc<ChallengeService>,
    pub verification_service: Arc<VerificationService>,
    pub nonce_store: Arc<dyn NonceStore>,
}

impl AppState {
    pub fn new(options: SiweOptions, nonce_store: Arc<dyn NonceStore>) -> Self {
        let options = Arc::new(options);

        Self {
            challenge_service: Arc::new(ChallengeService::new(
                options.clone(),
                nonce_store.clone(),
            )),
            verification_service: Arc::new(VerificationService::new(
                options,
                nonce_store.clone(),
            )),
            nonce_store,
        }
    }
}

impl FromRef<AppState> for Arc<ChallengeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.challenge_service.clone()
    }
}

impl FromRef<AppState> for Arc<VerificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verification_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn NonceStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.nonce_store.clone()
    }
}
