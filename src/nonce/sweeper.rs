//! Expired nonce cleanup

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::{NonceStore, StoreError};

/// Removes nonce records whose expiration has passed
#[derive(Clone)]
pub struct CleanupSweeper {
    nonce_store: Arc<dyn NonceStore>,
}

impl CleanupSweeper {
    pub fn new(nonce_store: Arc<dyn NonceStore>) -> Self {
        Self { nonce_store }
    }

    /// Delete every record expired at `now` and return how many were removed
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        tracing::debug!("Starting cleanup of expired nonces");

        let removed = self.nonce_store.delete_expired_before(now).await?;

        if removed == 0 {
            tracing::debug!("No expired nonces found to clean");
        } else {
            tracing::info!(removed, "Expired nonces cleaned");
        }

        Ok(removed)
    }

    /// Register the sweep as a cron job and start the scheduler
    ///
    /// `schedule` uses the six-field cron syntax (seconds first). A failed
    /// sweep is logged and retried on the next tick.
    pub async fn start(self, schedule: &str) -> Result<JobScheduler, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_id, _scheduler| {
            let sweeper = self.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.sweep(Utc::now()).await {
                    tracing::error!(error = %e, "Error during nonce cleanup");
                }
            })
        })?;

        let job_id = scheduler.add(job).await?;
        scheduler.start().await?;

        tracing::info!(%job_id, schedule, "Nonce cleanup job scheduled");

        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::InMemoryNonceStore;
    use chrono::Duration;

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = InMemoryNonceStore::new();
        let now = Utc::now();
        store.put("stale0001", now - Duration::minutes(1)).await.unwrap();
        store.put("fresh0001", now + Duration::minutes(1)).await.unwrap();

        let sweeper = CleanupSweeper::new(Arc::new(store.clone()));
        assert_eq!(sweeper.sweep(now).await.unwrap(), 1);
        assert!(store.contains("fresh0001").await);
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_to_remove() {
        let sweeper = CleanupSweeper::new(Arc::new(InMemoryNonceStore::new()));
        assert_eq!(sweeper.sweep(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_schedule() {
        let sweeper = CleanupSweeper::new(Arc::new(InMemoryNonceStore::new()));
        assert!(sweeper.start("not a cron expression").await.is_err());
    }
}
