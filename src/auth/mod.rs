//! Sign-In with Ethereum (EIP-4361)
//!
//! Challenge issuance and signed message verification, plus the message
//! codec and signature recovery they are built on.

pub mod address;
pub mod challenge;
pub mod crypto;
pub mod error;
pub mod expiry;
pub mod message;
pub mod verify;

pub use challenge::ChallengeService;
pub use crypto::{verify_eip191, SignatureError};
pub use error::AuthError;
pub use expiry::compute_expiry;
pub use message::{format_timestamp, MessageError, MessageFields, SiweMessage};
pub use verify::VerificationService;
