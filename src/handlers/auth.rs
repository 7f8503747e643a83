//! Authentication HTTP handlers
//!
//! Endpoints for Sign-In with Ethereum.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::auth::{AuthError, ChallengeService, VerificationService};
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthData, ChallengeRequest, ChallengeResponse, VerifiedIdentity};

/// POST /auth/siwe/challenge - Issue a nonce or a ready-to-sign message
pub async fn request_challenge(
    State(service): State<Arc<ChallengeService>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> ApiResult<Json<ChallengeResponse>> {
    let Json(req) = payload.map_err(challenge_rejection)?;

    let challenge = service.issue(&req).await?;

    Ok(Json(challenge))
}

/// POST /auth/siwe/verify - Verify a signed message and consume its nonce
pub async fn verify_message(
    State(service): State<Arc<VerificationService>>,
    payload: Result<Json<AuthData>, JsonRejection>,
) -> ApiResult<Json<VerifiedIdentity>> {
    let Json(auth) = payload?;

    let identity = service.verify(&auth).await?;

    Ok(Json(identity))
}

/// Well-formed JSON of the wrong shape is an invalid challenge request
fn challenge_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            tracing::warn!(error = %e.body_text(), "Rejected challenge request");
            AuthError::InvalidRequest(e.body_text()).into()
        }
        other => other.into(),
    }
}
