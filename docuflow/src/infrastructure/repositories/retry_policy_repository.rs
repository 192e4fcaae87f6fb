// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`RetryPolicyRepository`].

use async_trait::async_trait;
use docuflow_domain::entities::RetryPolicy;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::RetryPolicyRepository;
use docuflow_domain::value_objects::StageName;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

pub struct SqliteRetryPolicyRepository {
    pool: SqlitePool,
}

impl SqliteRetryPolicyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_policy(row: &sqlx::sqlite::SqliteRow) -> Result<RetryPolicy, DocPipeError> {
        let stage_name: Option<String> = row.get("stage_name");
        Ok(RetryPolicy {
            service_name: row.get("service_name"),
            stage_name: stage_name.map(|s| StageName::from_str(&s)).transpose().map_err(|e| DocPipeError::database(format!("corrupt stage name: {e}")))?,
            max_retries: row.get::<i64, _>("max_retries") as u32,
            base_delay: Duration::from_secs_f64(row.get::<f64, _>("base_delay_seconds")),
            max_delay: Duration::from_secs_f64(row.get::<f64, _>("max_delay_seconds")),
            exponential_base: row.get("exponential_base"),
            jitter_enabled: row.get("jitter_enabled"),
        })
    }
}

#[async_trait]
impl RetryPolicyRepository for SqliteRetryPolicyRepository {
    async fn find_for_stage(&self, service_name: &str, stage_name: StageName) -> Result<Option<RetryPolicy>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM retry_policies WHERE service_name = ? AND stage_name = ?")
            .bind(service_name)
            .bind(stage_name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query retry policy: {e}")))?;

        row.as_ref().map(Self::row_to_policy).transpose()
    }

    async fn find_for_service(&self, service_name: &str) -> Result<Option<RetryPolicy>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM retry_policies WHERE service_name = ? AND stage_name IS NULL")
            .bind(service_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query service retry policy: {e}")))?;

        row.as_ref().map(Self::row_to_policy).transpose()
    }

    async fn upsert(&self, policy: &RetryPolicy) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO retry_policies (service_name, stage_name, max_retries, base_delay_seconds, max_delay_seconds, exponential_base, jitter_enabled)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(service_name, stage_name) DO UPDATE SET
                max_retries = excluded.max_retries,
                base_delay_seconds = excluded.base_delay_seconds,
                max_delay_seconds = excluded.max_delay_seconds,
                exponential_base = excluded.exponential_base,
                jitter_enabled = excluded.jitter_enabled",
        )
        .bind(&policy.service_name)
        .bind(policy.stage_name.map(|s| s.as_str().to_string()))
        .bind(policy.max_retries as i64)
        .bind(policy.base_delay.as_secs_f64())
        .bind(policy.max_delay.as_secs_f64())
        .bind(policy.exponential_base)
        .bind(policy.jitter_enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert retry policy: {e}")))?;

        Ok(())
    }
}
