// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`PipelineErrorRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuflow_domain::entities::{PipelineErrorRecord, PipelineErrorStatus};
use docuflow_domain::error::{DocPipeError, ErrorCategory};
use docuflow_domain::repositories::PipelineErrorRepository;
use docuflow_domain::value_objects::{CorrelationId, DocumentId, StageName};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

pub struct SqlitePipelineErrorRepository {
    pool: SqlitePool,
}

impl SqlitePipelineErrorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineErrorRecord, DocPipeError> {
        let id: String = row.get("id");
        let document_id: String = row.get("document_id");
        let stage_name: String = row.get("stage_name");
        let category: String = row.get("category");
        let status: String = row.get("status");
        let correlation_id: String = row.get("correlation_id");
        let next_retry_at: Option<String> = row.get("next_retry_at");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(PipelineErrorRecord {
            id: Uuid::parse_str(&id).map_err(|e| DocPipeError::database(format!("corrupt error id: {e}")))?,
            document_id: DocumentId::from_str(&document_id).map_err(|e| DocPipeError::database(format!("corrupt document id: {e}")))?,
            stage: StageName::from_str(&stage_name).map_err(|e| DocPipeError::database(format!("corrupt stage name: {e}")))?,
            category: parse_category(&category)?,
            message: row.get("message"),
            stack: row.get("stack"),
            retry_attempt: row.get::<i64, _>("retry_attempt") as u32,
            max_retries: row.get::<i64, _>("max_retries") as u32,
            status: parse_error_status(&status)?,
            correlation_id: CorrelationId::from_raw(correlation_id),
            next_retry_at: next_retry_at.map(|s| parse_timestamp(&s)).transpose()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn parse_category(s: &str) -> Result<ErrorCategory, DocPipeError> {
    match s {
        "input_invalid" => Ok(ErrorCategory::InputInvalid),
        "external_transient" => Ok(ErrorCategory::ExternalTransient),
        "external_permanent" => Ok(ErrorCategory::ExternalPermanent),
        "handler_bug" => Ok(ErrorCategory::HandlerBug),
        "coordination" => Ok(ErrorCategory::Coordination),
        "cancelled" => Ok(ErrorCategory::Cancelled),
        other => Err(DocPipeError::database(format!("unknown error category: {other}"))),
    }
}

fn parse_error_status(s: &str) -> Result<PipelineErrorStatus, DocPipeError> {
    match s {
        "pending" => Ok(PipelineErrorStatus::Pending),
        "retrying" => Ok(PipelineErrorStatus::Retrying),
        "resolved" => Ok(PipelineErrorStatus::Resolved),
        "failed" => Ok(PipelineErrorStatus::Failed),
        other => Err(DocPipeError::database(format!("unknown pipeline error status: {other}"))),
    }
}

fn error_status_str(status: PipelineErrorStatus) -> &'static str {
    match status {
        PipelineErrorStatus::Pending => "pending",
        PipelineErrorStatus::Retrying => "retrying",
        PipelineErrorStatus::Resolved => "resolved",
        PipelineErrorStatus::Failed => "failed",
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DocPipeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocPipeError::database(format!("corrupt timestamp: {e}")))
}

#[async_trait]
impl PipelineErrorRepository for SqlitePipelineErrorRepository {
    async fn insert(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO pipeline_errors
             (id, document_id, stage_name, category, message, stack, retry_attempt, max_retries, status, correlation_id, next_retry_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(error.id.to_string())
        .bind(error.document_id.to_string())
        .bind(error.stage.as_str())
        .bind(error.category.as_str())
        .bind(&error.message)
        .bind(&error.stack)
        .bind(error.retry_attempt as i64)
        .bind(error.max_retries as i64)
        .bind(error_status_str(error.status))
        .bind(error.correlation_id.as_str())
        .bind(error.next_retry_at.map(|t| t.to_rfc3339()))
        .bind(error.created_at.to_rfc3339())
        .bind(error.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to insert pipeline error: {e}")))?;

        Ok(())
    }

    async fn update(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
        sqlx::query(
            "UPDATE pipeline_errors SET status = ?, next_retry_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(error_status_str(error.status))
        .bind(error.next_retry_at.map(|t| t.to_rfc3339()))
        .bind(error.updated_at.to_rfc3339())
        .bind(error.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to update pipeline error: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineErrorRecord>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM pipeline_errors WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query pipeline error: {e}")))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<PipelineErrorRecord>, DocPipeError> {
        let rows = sqlx::query("SELECT * FROM pipeline_errors WHERE document_id = ? ORDER BY created_at")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to list pipeline errors: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
