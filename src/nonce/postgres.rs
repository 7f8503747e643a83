//! PostgreSQL nonce store
//!
//! Consumption is a single `DELETE ... RETURNING`, so concurrent requests
//! across any number of server instances cannot both claim one nonce.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{ConsumeOutcome, NonceStore, StoreError};

#[derive(Clone)]
pub struct PgNonceStore {
    db_pool: PgPool,
    timeout: Duration,
}

impl PgNonceStore {
    /// Create a store whose calls fail with [`StoreError::Timeout`] after `timeout`
    pub fn new(db_pool: PgPool, timeout: Duration) -> Self {
        Self { db_pool, timeout }
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }
}

#[async_trait::async_trait]
impl NonceStore for PgNonceStore {
    async fn put(&self, nonce: &str, expiration_time: DateTime<Utc>) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO auth_nonces (nonce, expiration_time)
                VALUES ($1, $2)
                ON CONFLICT (nonce) DO UPDATE
                    SET expiration_time = EXCLUDED.expiration_time,
                        created_at      = NOW()
                "#,
            )
            .bind(nonce)
            .bind(expiration_time)
            .execute(&self.db_pool),
        )
        .await?;

        Ok(())
    }

    async fn consume_if_valid(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, StoreError> {
        // Expired rows are deleted too; the returned expiration tells the two apart
        let expiration_time: Option<DateTime<Utc>> = self
            .bounded(
                sqlx::query_scalar(
                    r#"
                    DELETE FROM auth_nonces
                    WHERE nonce = $1
                    RETURNING expiration_time
                    "#,
                )
                .bind(nonce)
                .fetch_optional(&self.db_pool),
            )
            .await?;

        Ok(match expiration_time {
            Some(expiration_time) if expiration_time > now => ConsumeOutcome::Consumed,
            Some(_) => ConsumeOutcome::Expired,
            None => ConsumeOutcome::NotFound,
        })
    }

    async fn delete(&self, nonce: &str) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("DELETE FROM auth_nonces WHERE nonce = $1")
                .bind(nonce)
                .execute(&self.db_pool),
        )
        .await?;

        Ok(())
    }

    async fn delete_expired_before(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    DELETE FROM auth_nonces
                    WHERE expiration_time <= $1
                    "#,
                )
                .bind(now)
                .execute(&self.db_pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        self.bounded(sqlx::query("SELECT 1").execute(&self.db_pool))
            .await?;

        Ok(())
    }
}
