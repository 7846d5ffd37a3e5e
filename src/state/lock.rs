use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::traits::{DistributedLock, LockGuard};

/// Lease-based mutual exclusion on a `dist_locks` row.
///
/// A lock is taken by inserting the key, or by stealing a row whose
/// lease has expired. A crashed holder therefore blocks others only
/// until its lease runs out.
pub struct SqliteLock {
    pool: SqlitePool,
}

impl SqliteLock {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DistributedLock for SqliteLock {
    async fn try_acquire(
        &self,
        key: &str,
        lease: Duration,
    ) -> anyhow::Result<Option<Box<dyn LockGuard>>> {
        let owner = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(lease)?;

        let result = sqlx::query(
            "INSERT INTO dist_locks (key, owner, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
               owner = excluded.owner,
               expires_at = excluded.expires_at
             WHERE dist_locks.expires_at <= ?",
        )
        .bind(key)
        .bind(&owner)
        .bind(expires_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Box::new(SqliteLockGuard {
            pool: self.pool.clone(),
            key: key.to_string(),
            owner,
            released: false,
        })))
    }
}

struct SqliteLockGuard {
    pool: SqlitePool,
    key: String,
    owner: String,
    released: bool,
}

impl SqliteLockGuard {
    async fn delete_row(pool: &SqlitePool, key: &str, owner: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM dist_locks WHERE key = ? AND owner = ?")
            .bind(key)
            .bind(owner)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LockGuard for SqliteLockGuard {
    async fn release(mut self: Box<Self>) -> anyhow::Result<()> {
        self.released = true;
        Self::delete_row(&self.pool, &self.key, &self.owner).await
    }
}

impl Drop for SqliteLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Best-effort cleanup; the lease expiry covers the rest.
        let pool = self.pool.clone();
        let key = std::mem::take(&mut self.key);
        let owner = std::mem::take(&mut self.owner);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = Self::delete_row(&pool, &key, &owner).await {
                    warn!(key = %key, "Failed to release dropped lock: {}", e);
                }
            });
        }
    }
}
