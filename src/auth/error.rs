//! Authentication error taxonomy

use thiserror::Error;

use super::crypto::SignatureError;
use super::message::MessageError;
use crate::nonce::StoreError;

/// Every way a challenge or verification request can fail
///
/// All variants except [`AuthError::ChallengePersistenceFailed`] and
/// [`AuthError::Internal`] are final: the client has to start a new
/// challenge/response cycle.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid challenge request: {0}")]
    InvalidRequest(String),

    #[error("Missing required fields in authData (message, signature, nonce, address)")]
    MissingFields,

    #[error("Invalid SIWE message format: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error("Invalid domain")]
    DomainMismatch,

    #[error("Invalid statement")]
    StatementMismatch,

    #[error("Invalid version")]
    VersionMismatch,

    #[error("Address mismatch")]
    AddressMismatch,

    #[error("Invalid signature")]
    InvalidSignature(#[source] SignatureError),

    #[error("Message expired or nonce invalid")]
    NonceInvalidOrExpired,

    #[error("Failed to save nonce for challenge")]
    ChallengePersistenceFailed(#[source] StoreError),

    #[error("Internal authentication error")]
    Internal(#[source] StoreError),
}

impl AuthError {
    /// Stable code used in logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest(_) => "INVALID_REQUEST",
            AuthError::MissingFields => "MISSING_FIELDS",
            AuthError::MalformedMessage(_) => "MALFORMED_MESSAGE",
            AuthError::DomainMismatch => "DOMAIN_MISMATCH",
            AuthError::StatementMismatch => "STATEMENT_MISMATCH",
            AuthError::VersionMismatch => "VERSION_MISMATCH",
            AuthError::AddressMismatch => "ADDRESS_MISMATCH",
            AuthError::InvalidSignature(_) => "INVALID_SIGNATURE",
            AuthError::NonceInvalidOrExpired => "NONCE_INVALID_OR_EXPIRED",
            AuthError::ChallengePersistenceFailed(_) => "CHALLENGE_PERSISTENCE_FAILED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::ChallengePersistenceFailed(_) | AuthError::Internal(_)
        )
    }
}
