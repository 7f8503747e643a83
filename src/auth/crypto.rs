//! Ethereum wallet signature verification
//!
//! Verifies EIP-191 `personal_sign` signatures (secp256k1, keccak256 of the
//! prefixed message) over the canonical text of a sign-in message.

use hex::FromHex;
use siwe::VerificationError;
use thiserror::Error;

use super::message::SiweMessage;

/// Length of an `r || s || v` signature in bytes
const SIGNATURE_LENGTH: usize = 65;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Signer recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Recovered signer does not match the message address")]
    SignerMismatch,
}

/// Verify that `signature_hex` over the text of `message` was produced by
/// the address the message names
///
/// # Arguments
/// * `message` - The parsed message; its canonical text is what was signed
/// * `signature_hex` - 65-byte `r || s || v` signature, hex encoded, `0x` optional
///
/// # Returns
/// * `Ok(())` when the recovered signer is the message address
/// * `Err(SignatureError)` for any malformed input or mismatch
pub fn verify_eip191(message: &SiweMessage, signature_hex: &str) -> Result<(), SignatureError> {
    let signature = decode_signature(signature_hex)?;

    message
        .as_siwe()
        .verify_eip191(&signature)
        .map(|_| ())
        .map_err(|e| match e {
            VerificationError::Signer => SignatureError::SignerMismatch,
            other => SignatureError::RecoveryFailed(other.to_string()),
        })
}

fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_LENGTH], SignatureError> {
    let digits = signature_hex
        .strip_prefix("0x")
        .or_else(|| signature_hex.strip_prefix("0X"))
        .unwrap_or(signature_hex);

    if digits.len() != SIGNATURE_LENGTH * 2 {
        return Err(SignatureError::InvalidSignatureFormat(format!(
            "expected {} hex chars, got {}",
            SIGNATURE_LENGTH * 2,
            digits.len()
        )));
    }

    <[u8; SIGNATURE_LENGTH]>::from_hex(digits)
        .map_err(|e| SignatureError::InvalidSignatureFormat(e.to_string()))
}
