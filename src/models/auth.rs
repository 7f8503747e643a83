//! Sign-in request and response models

use serde::{Deserialize, Serialize};

/// Request for a sign-in challenge
///
/// Fields of the `message` variant are optional at the wire level so that
/// missing values are reported as an invalid request by the challenge
/// service rather than as a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "responseType")]
pub enum ChallengeRequest {
    /// Return a fully prepared message for the wallet to sign
    #[serde(rename = "message", rename_all = "camelCase")]
    Message {
        address: Option<String>,
        uri: Option<String>,
        chain_id: Option<i64>,
    },

    /// Return only the nonce and its expiration; the client builds the message
    #[serde(rename = "nonce-expiration")]
    NonceExpiration,
}

impl ChallengeRequest {
    pub fn response_type(&self) -> &'static str {
        match self {
            ChallengeRequest::Message { .. } => "message",
            ChallengeRequest::NonceExpiration => "nonce-expiration",
        }
    }
}

/// Issued challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChallengeResponse {
    #[serde(rename_all = "camelCase")]
    NonceExpiration {
        nonce: String,
        expiration_time: String,
    },

    Message {
        message: String,
        nonce: String,
    },
}

impl ChallengeResponse {
    pub fn nonce(&self) -> &str {
        match self {
            ChallengeResponse::NonceExpiration { nonce, .. } => nonce,
            ChallengeResponse::Message { nonce, .. } => nonce,
        }
    }
}

/// Signed response to a challenge
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthData {
    pub message: Option<String>,
    pub signature: Option<String>,
    pub nonce: Option<String>,
    pub address: Option<String>,
}

/// Identity established by a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// EIP-55 checksummed signer address
    pub address: String,
    pub chain_id: u64,
    pub nonce: String,
}
