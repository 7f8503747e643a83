//! Signed message verification
//!
//! Checks run cheapest first and stop at the first failure. The nonce store
//! is only touched once the signature has been proven, so an unauthenticated
//! request can never consume or delete a nonce.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::crypto::verify_eip191;
use super::error::AuthError;
use super::message::SiweMessage;
use crate::config::SiweOptions;
use crate::models::{AuthData, VerifiedIdentity};
use crate::nonce::{ConsumeOutcome, NonceStore};

/// Fields of an [`AuthData`] after the presence check
struct SignedFields<'a> {
    message: &'a str,
    signature: &'a str,
    nonce: &'a str,
    address: &'a str,
}

/// Verifies signed sign-in messages
#[derive(Clone)]
pub struct VerificationService {
    options: Arc<SiweOptions>,
    nonce_store: Arc<dyn NonceStore>,
}

impl VerificationService {
    pub fn new(options: Arc<SiweOptions>, nonce_store: Arc<dyn NonceStore>) -> Self {
        Self {
            options,
            nonce_store,
        }
    }

    /// Verify a signed message as of now
    pub async fn verify(&self, auth: &AuthData) -> Result<VerifiedIdentity, AuthError> {
        self.verify_at(auth, Utc::now()).await
    }

    /// Verify a signed message as of `now`
    pub async fn verify_at(
        &self,
        auth: &AuthData,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let result = self.run_checks(auth, now).await;

        match &result {
            Ok(identity) => {
                tracing::info!(
                    address = %identity.address,
                    chain_id = identity.chain_id,
                    nonce = %identity.nonce,
                    "SIWE verification succeeded"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error_code = e.code(),
                    nonce = auth.nonce.as_deref().unwrap_or_default(),
                    error = %e,
                    "SIWE verification failed"
                );
            }
        }

        result
    }

    async fn run_checks(
        &self,
        auth: &AuthData,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let fields = required_fields(auth)?;

        let siwe = SiweMessage::parse(fields.message)?;

        if siwe.domain() != self.options.domain() {
            return Err(AuthError::DomainMismatch);
        }
        if siwe.statement() != Some(self.options.statement()) {
            return Err(AuthError::StatementMismatch);
        }
        if siwe.version() != self.options.version() {
            return Err(AuthError::VersionMismatch);
        }

        let address = siwe.address();
        if !address.eq_ignore_ascii_case(fields.address) {
            return Err(AuthError::AddressMismatch);
        }

        check_validity_window(&siwe, fields.nonce, now)?;

        verify_eip191(&siwe, fields.signature).map_err(AuthError::InvalidSignature)?;

        if self.options.prevent_replay() {
            self.consume_nonce(siwe.nonce(), now).await?;
        }

        Ok(VerifiedIdentity {
            address,
            chain_id: siwe.chain_id(),
            nonce: siwe.nonce().to_string(),
        })
    }

    async fn consume_nonce(&self, nonce: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let outcome = self
            .nonce_store
            .consume_if_valid(nonce, now)
            .await
            .map_err(|e| {
                tracing::error!(nonce = %nonce, error = %e, "Failed to consume nonce");
                AuthError::Internal(e)
            })?;

        match outcome {
            ConsumeOutcome::Consumed => Ok(()),
            ConsumeOutcome::NotFound | ConsumeOutcome::Expired => {
                // Cleanup only; the primary error stands whatever happens here
                if let Err(e) = self.nonce_store.delete(nonce).await {
                    tracing::warn!(nonce = %nonce, error = %e, "Failed to delete stale nonce");
                }
                Err(AuthError::NonceInvalidOrExpired)
            }
        }
    }
}

fn required_fields(auth: &AuthData) -> Result<SignedFields<'_>, AuthError> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    match (
        present(&auth.message),
        present(&auth.signature),
        present(&auth.nonce),
        present(&auth.address),
    ) {
        (Some(message), Some(signature), Some(nonce), Some(address)) => Ok(SignedFields {
            message,
            signature,
            nonce,
            address,
        }),
        _ => Err(AuthError::MissingFields),
    }
}

/// Nonce binding and the message's own time bounds
fn check_validity_window(
    siwe: &SiweMessage,
    nonce: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    if siwe.nonce() != nonce {
        return Err(AuthError::NonceInvalidOrExpired);
    }

    if let Some(expiration_time) = siwe.expiration_time() {
        if expiration_time <= now {
            return Err(AuthError::NonceInvalidOrExpired);
        }
    }

    if let Some(not_before) = siwe.not_before() {
        if not_before > now {
            return Err(AuthError::NonceInvalidOrExpired);
        }
    }

    Ok(())
}
