// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`StageStatusRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuflow_domain::entities::{StageExecutionStatus, StageStatus};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::StageStatusRepository;
use docuflow_domain::value_objects::{DocumentId, Progress, StageName};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

pub struct SqliteStageStatusRepository {
    pool: SqlitePool,
}

impl SqliteStageStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_status(row: &sqlx::sqlite::SqliteRow) -> Result<StageStatus, DocPipeError> {
        let document_id: String = row.get("document_id");
        let stage_name: String = row.get("stage_name");
        let status: String = row.get("status");
        let metadata: String = row.get("metadata");
        let started_at: Option<String> = row.get("started_at");
        let completed_at: Option<String> = row.get("completed_at");

        Ok(StageStatus {
            document_id: DocumentId::from_str(&document_id).map_err(|e| DocPipeError::database(format!("corrupt document id: {e}")))?,
            stage: StageName::from_str(&stage_name).map_err(|e| DocPipeError::database(format!("corrupt stage name: {e}")))?,
            status: parse_exec_status(&status)?,
            progress: Progress::from_raw(row.get::<i64, _>("progress") as f64).0,
            started_at: started_at.map(|s| parse_timestamp(&s)).transpose()?,
            completed_at: completed_at.map(|s| parse_timestamp(&s)).transpose()?,
            last_error: row.get("last_error"),
            metadata: serde_json::from_str::<HashMap<String, serde_json::Value>>(&metadata)
                .map_err(|e| DocPipeError::database(format!("corrupt stage metadata: {e}")))?,
            attempt: row.get::<i64, _>("attempt") as u32,
        })
    }
}

fn parse_exec_status(s: &str) -> Result<StageExecutionStatus, DocPipeError> {
    match s {
        "pending" => Ok(StageExecutionStatus::Pending),
        "running" => Ok(StageExecutionStatus::Running),
        "completed" => Ok(StageExecutionStatus::Completed),
        "failed" => Ok(StageExecutionStatus::Failed),
        "skipped" => Ok(StageExecutionStatus::Skipped),
        other => Err(DocPipeError::database(format!("unknown stage status: {other}"))),
    }
}

fn exec_status_str(status: StageExecutionStatus) -> &'static str {
    match status {
        StageExecutionStatus::Pending => "pending",
        StageExecutionStatus::Running => "running",
        StageExecutionStatus::Completed => "completed",
        StageExecutionStatus::Failed => "failed",
        StageExecutionStatus::Skipped => "skipped",
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DocPipeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocPipeError::database(format!("corrupt timestamp: {e}")))
}

#[async_trait]
impl StageStatusRepository for SqliteStageStatusRepository {
    async fn upsert(&self, status: &StageStatus) -> Result<(), DocPipeError> {
        let metadata = serde_json::to_string(&status.metadata)?;

        sqlx::query(
            "INSERT INTO stage_status (document_id, stage_name, status, progress, started_at, completed_at, last_error, metadata, attempt)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(document_id, stage_name) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                last_error = excluded.last_error,
                metadata = excluded.metadata,
                attempt = excluded.attempt",
        )
        .bind(status.document_id.to_string())
        .bind(status.stage.as_str())
        .bind(exec_status_str(status.status))
        .bind(status.progress.value() as i64)
        .bind(status.started_at.map(|t| t.to_rfc3339()))
        .bind(status.completed_at.map(|t| t.to_rfc3339()))
        .bind(&status.last_error)
        .bind(metadata)
        .bind(status.attempt as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert stage status: {e}")))?;

        Ok(())
    }

    async fn find(&self, document_id: DocumentId, stage: StageName) -> Result<Option<StageStatus>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM stage_status WHERE document_id = ? AND stage_name = ?")
            .bind(document_id.to_string())
            .bind(stage.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query stage status: {e}")))?;

        row.as_ref().map(Self::row_to_status).transpose()
    }

    async fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, DocPipeError> {
        let rows = sqlx::query("SELECT * FROM stage_status WHERE document_id = ?")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to list stage statuses: {e}")))?;

        rows.iter().map(Self::row_to_status).collect()
    }
}
