//! In-process nonce store
//!
//! Suitable for a single server instance and for tests. Every operation runs
//! under one write lock, which makes consumption atomic.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ConsumeOutcome, NonceStore, StoreError};

#[derive(Clone, Default)]
pub struct InMemoryNonceStore {
    records: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records, expired or not
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, nonce: &str) -> bool {
        self.records.read().await.contains_key(nonce)
    }
}

#[async_trait::async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn put(&self, nonce: &str, expiration_time: DateTime<Utc>) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(nonce.to_string(), expiration_time);

        Ok(())
    }

    async fn consume_if_valid(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, StoreError> {
        let outcome = match self.records.write().await.remove(nonce) {
            Some(expiration_time) if expiration_time > now => ConsumeOutcome::Consumed,
            Some(_) => ConsumeOutcome::Expired,
            None => ConsumeOutcome::NotFound,
        };

        Ok(outcome)
    }

    async fn delete(&self, nonce: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(nonce);
        Ok(())
    }

    async fn delete_expired_before(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, expiration_time| *expiration_time > now);

        Ok((before - records.len()) as u64)
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
