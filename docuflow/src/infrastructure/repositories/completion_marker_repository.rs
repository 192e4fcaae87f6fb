// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`CompletionMarkerRepository`], the idempotency store's
//! persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuflow_domain::entities::CompletionMarker;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::CompletionMarkerRepository;
use docuflow_domain::value_objects::{ContentHash, DocumentId, StageName};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

pub struct SqliteCompletionMarkerRepository {
    pool: SqlitePool,
}

impl SqliteCompletionMarkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DocPipeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocPipeError::database(format!("corrupt timestamp: {e}")))
}

#[async_trait]
impl CompletionMarkerRepository for SqliteCompletionMarkerRepository {
    async fn upsert(&self, marker: &CompletionMarker) -> Result<(), DocPipeError> {
        let metadata = serde_json::to_string(&marker.metadata)?;

        sqlx::query(
            "INSERT INTO completion_markers (document_id, stage_name, data_hash, completed_at, metadata)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(document_id, stage_name) DO UPDATE SET
                data_hash = excluded.data_hash,
                completed_at = excluded.completed_at,
                metadata = excluded.metadata",
        )
        .bind(marker.document_id.to_string())
        .bind(marker.stage.as_str())
        .bind(marker.data_hash.as_hex())
        .bind(marker.completed_at.to_rfc3339())
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert completion marker: {e}")))?;

        Ok(())
    }

    async fn find(&self, document_id: DocumentId, stage: StageName) -> Result<Option<CompletionMarker>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM completion_markers WHERE document_id = ? AND stage_name = ?")
            .bind(document_id.to_string())
            .bind(stage.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query completion marker: {e}")))?;

        let Some(row) = row else { return Ok(None) };

        let metadata: String = row.get("metadata");
        let completed_at: String = row.get("completed_at");

        Ok(Some(CompletionMarker {
            document_id,
            stage,
            data_hash: ContentHash::from_hex(row.get::<String, _>("data_hash")),
            completed_at: parse_timestamp(&completed_at)?,
            metadata: serde_json::from_str::<HashMap<String, serde_json::Value>>(&metadata)
                .map_err(|e| DocPipeError::database(format!("corrupt marker metadata: {e}")))?,
        }))
    }

    async fn clear(&self, document_id: DocumentId, stage: StageName) -> Result<(), DocPipeError> {
        sqlx::query("DELETE FROM completion_markers WHERE document_id = ? AND stage_name = ?")
            .bind(document_id.to_string())
            .bind(stage.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to clear completion marker: {e}")))?;

        Ok(())
    }
}

