//! Challenge issuance
//!
//! First half of the sign-in protocol: hand out a fresh nonce, optionally
//! wrapped in a ready-to-sign message.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

use super::address::to_checksum_address;
use super::error::AuthError;
use super::expiry::compute_expiry;
use super::message::{format_timestamp, MessageError, MessageFields, SiweMessage};
use crate::config::SiweOptions;
use crate::models::{ChallengeRequest, ChallengeResponse};
use crate::nonce::{generate_nonce, NonceStore};

/// Fields of a validated `message` challenge request
struct MessageTarget {
    address: String,
    uri: String,
    chain_id: u64,
}

/// Issues sign-in challenges
#[derive(Clone)]
pub struct ChallengeService {
    options: Arc<SiweOptions>,
    nonce_store: Arc<dyn NonceStore>,
}

impl ChallengeService {
    pub fn new(options: Arc<SiweOptions>, nonce_store: Arc<dyn NonceStore>) -> Self {
        Self {
            options,
            nonce_store,
        }
    }

    /// Issue a challenge valid from now
    pub async fn issue(&self, request: &ChallengeRequest) -> Result<ChallengeResponse, AuthError> {
        self.issue_at(request, Utc::now()).await
    }

    /// Issue a challenge as of `now`
    ///
    /// With replay prevention enabled the nonce is stored before it is
    /// returned; if storing fails no challenge is handed out.
    pub async fn issue_at(
        &self,
        request: &ChallengeRequest,
        now: DateTime<Utc>,
    ) -> Result<ChallengeResponse, AuthError> {
        let target = validate_request(request).inspect_err(|e| {
            tracing::warn!(
                error_code = e.code(),
                response_type = request.response_type(),
                error = %e,
                "Rejected challenge request"
            );
        })?;

        let nonce = generate_nonce();
        let issued_at = now.trunc_subsecs(3);
        let expiration_time = compute_expiry(now, self.options.message_validity());
        let expiration_time_text = format_timestamp(expiration_time);

        tracing::info!(
            response_type = request.response_type(),
            nonce = %nonce,
            expires = %expiration_time_text,
            "Generating challenge"
        );

        let response = match target {
            None => ChallengeResponse::NonceExpiration {
                nonce: nonce.clone(),
                expiration_time: expiration_time_text,
            },
            Some(target) => ChallengeResponse::Message {
                message: self.render_message(target, &nonce, issued_at, expiration_time)?,
                nonce: nonce.clone(),
            },
        };

        if self.options.prevent_replay() {
            self.nonce_store
                .put(&nonce, expiration_time)
                .await
                .map_err(|e| {
                    tracing::error!(nonce = %nonce, error = %e, "Failed to save nonce");
                    AuthError::ChallengePersistenceFailed(e)
                })?;

            tracing::debug!(nonce = %nonce, "Nonce saved for replay prevention");
        }

        Ok(response)
    }

    /// Canonical text of the message handed to the wallet
    fn render_message(
        &self,
        target: MessageTarget,
        nonce: &str,
        issued_at: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let message = SiweMessage::try_from(MessageFields {
            domain: self.options.domain().to_string(),
            address: target.address,
            statement: Some(self.options.statement().to_string()),
            uri: target.uri,
            version: self.options.version().to_string(),
            chain_id: target.chain_id,
            nonce: nonce.to_string(),
            issued_at,
            expiration_time: Some(expiration_time),
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected challenge request");
            match e {
                MessageError::InvalidField { field: "URI", .. } => {
                    AuthError::InvalidRequest("Valid URI is required for challenge.".to_string())
                }
                other => AuthError::InvalidRequest(other.to_string()),
            }
        })?;

        Ok(message.to_string())
    }
}

fn validate_request(request: &ChallengeRequest) -> Result<Option<MessageTarget>, AuthError> {
    let ChallengeRequest::Message {
        address,
        uri,
        chain_id,
    } = request
    else {
        return Ok(None);
    };

    let chain_id = chain_id
        .filter(|id| *id > 0)
        .and_then(|id| u64::try_from(id).ok())
        .ok_or_else(|| {
            AuthError::InvalidRequest("Invalid chainId provided for challenge.".to_string())
        })?;

    let address = address
        .as_deref()
        .and_then(to_checksum_address)
        .ok_or_else(|| {
            AuthError::InvalidRequest(
                "Invalid Ethereum address provided for challenge.".to_string(),
            )
        })?;

    let uri = uri
        .as_deref()
        .map(str::trim)
        .filter(|uri| !uri.is_empty() && !uri.contains('\n'))
        .ok_or_else(|| {
            AuthError::InvalidRequest("Valid URI is required for challenge.".to_string())
        })?
        .to_string();

    Ok(Some(MessageTarget {
        address,
        uri,
        chain_id,
    }))
}
