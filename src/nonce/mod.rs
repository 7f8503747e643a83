//! Nonce persistence for replay prevention
//!
//! A nonce record is the sole authority for "this challenge can still be
//! claimed". Stores must make consumption atomic: when several requests race
//! on the same nonce, exactly one of them observes [`ConsumeOutcome::Consumed`].

mod memory;
mod postgres;
mod sweeper;

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

pub use memory::InMemoryNonceStore;
pub use postgres::PgNonceStore;
pub use sweeper::CleanupSweeper;

/// Length of generated nonces
pub const NONCE_LENGTH: usize = 24;

/// Nonce store errors
///
/// Never interpreted as "nonce invalid": callers surface these as internal
/// failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Nonce store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of an attempt to consume a nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The record existed, was still valid and has been removed
    Consumed,
    /// No record exists for the nonce
    NotFound,
    /// The record existed but had expired; it has been removed
    Expired,
}

#[async_trait::async_trait]
pub trait NonceStore: Send + Sync {
    /// Store a nonce, replacing any existing record with the same value
    async fn put(&self, nonce: &str, expiration_time: DateTime<Utc>) -> Result<(), StoreError>;

    /// Atomically remove the record for `nonce` and report whether it was claimable at `now`
    async fn consume_if_valid(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Remove the record for `nonce` if one exists
    async fn delete(&self, nonce: &str) -> Result<(), StoreError>;

    /// Remove every record that expired at or before `now`, returning how many were removed
    async fn delete_expired_before(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Check that the backing storage is reachable
    async fn check_health(&self) -> Result<(), StoreError>;
}

/// Generate a cryptographically secure nonce
///
/// Alphanumeric only, which keeps it URL-safe and valid for EIP-4361.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}
