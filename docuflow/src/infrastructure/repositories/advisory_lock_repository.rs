// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-table emulation of a session-scoped advisory lock. SQLite has no
//! `pg_advisory_lock` equivalent, so this keeps one row per held
//! `(document_id, stage_name)` lock name and uses a non-blocking upsert to
//! acquire it. A
//! lease (`expires_at`) bounds how long a crashed holder can block a stage;
//! `try_acquire` reclaims an expired lease in the same statement that would
//! otherwise fail on the primary-key conflict.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::services::{AdvisoryLockManager, LockToken};
use docuflow_domain::value_objects::{DocumentId, StageName};
use sqlx::SqlitePool;

pub struct SqliteAdvisoryLockManager {
    pool: SqlitePool,
    lease: ChronoDuration,
}

impl SqliteAdvisoryLockManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lease: ChronoDuration::seconds(300),
        }
    }

    pub fn with_lease(pool: SqlitePool, lease: ChronoDuration) -> Self {
        Self { pool, lease }
    }

    fn lock_name(document_id: DocumentId, stage_name: StageName) -> String {
        format!("{document_id}:{}", stage_name.as_str())
    }
}

#[async_trait]
impl AdvisoryLockManager for SqliteAdvisoryLockManager {
    async fn try_acquire(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<LockToken>, DocPipeError> {
        let lock_name = Self::lock_name(document_id, stage_name);
        let token = LockToken::new();
        let now = Utc::now();
        let expires_at = now + self.lease;

        // Reclaim an expired lease (previous holder crashed without
        // releasing) or take the lock fresh; either way the statement only
        // succeeds for one caller when raced concurrently, since SQLite
        // serializes writers.
        let result = sqlx::query(
            "INSERT INTO advisory_locks (lock_name, token, acquired_at, expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(lock_name) DO UPDATE SET token = excluded.token, acquired_at = excluded.acquired_at, expires_at = excluded.expires_at
             WHERE advisory_locks.expires_at < ?",
        )
        .bind(&lock_name)
        .bind(token.0.to_string())
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to acquire advisory lock: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        // The upsert can "succeed" (rows_affected=1) for an INSERT even
        // when a live lock already holds the row, only if the row didn't
        // exist yet; once it exists the WHERE clause gates every future
        // writer, so a second verifying read confirms this caller actually
        // owns the token before reporting success.
        let owned: Option<String> = sqlx::query_scalar("SELECT token FROM advisory_locks WHERE lock_name = ?")
            .bind(&lock_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to verify advisory lock: {e}")))?;

        if owned.as_deref() == Some(token.0.to_string().as_str()) {
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, document_id: DocumentId, stage_name: StageName, token: LockToken) -> Result<(), DocPipeError> {
        let lock_name = Self::lock_name(document_id, stage_name);
        sqlx::query("DELETE FROM advisory_locks WHERE lock_name = ? AND token = ?")
            .bind(lock_name)
            .bind(token.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to release advisory lock: {e}")))?;

        Ok(())
    }
}

