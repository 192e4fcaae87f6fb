// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`DocumentRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuflow_domain::entities::{Document, DocumentStatus};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::DocumentRepository;
use docuflow_domain::value_objects::{ContentHash, DocumentId};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, DocPipeError> {
        let id: String = row.get("id");
        let status: String = row.get("status");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Document {
            id: DocumentId::from_str(&id).map_err(|e| DocPipeError::database(format!("corrupt document id: {e}")))?,
            source_filename: row.get("source_filename"),
            content_hash: ContentHash::from_hex(row.get::<String, _>("content_hash")),
            manufacturer: row.get("manufacturer"),
            document_type: row.get("document_type"),
            status: parse_status(&status)?,
            search_ready: row.get("search_ready"),
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn parse_status(s: &str) -> Result<DocumentStatus, DocPipeError> {
    match s {
        "pending" => Ok(DocumentStatus::Pending),
        "running" => Ok(DocumentStatus::Running),
        "completed" => Ok(DocumentStatus::Completed),
        "failed" => Ok(DocumentStatus::Failed),
        other => Err(DocPipeError::database(format!("unknown document status: {other}"))),
    }
}

fn status_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Pending => "pending",
        DocumentStatus::Running => "running",
        DocumentStatus::Completed => "completed",
        DocumentStatus::Failed => "failed",
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DocPipeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocPipeError::database(format!("corrupt timestamp: {e}")))
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn save(&self, document: &Document) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO documents (id, source_filename, content_hash, manufacturer, document_type, status, search_ready, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                source_filename = excluded.source_filename,
                content_hash = excluded.content_hash,
                manufacturer = excluded.manufacturer,
                document_type = excluded.document_type,
                status = excluded.status,
                search_ready = excluded.search_ready,
                updated_at = excluded.updated_at",
        )
        .bind(document.id.to_string())
        .bind(&document.source_filename)
        .bind(document.content_hash.as_hex())
        .bind(&document.manufacturer)
        .bind(&document.document_type)
        .bind(status_str(document.status))
        .bind(document.search_ready)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to save document: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query document: {e}")))?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn find_by_content_hash(&self, hash: &ContentHash) -> Result<Option<Document>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM documents WHERE content_hash = ?")
            .bind(hash.as_hex())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to query document by hash: {e}")))?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Document>, DocPipeError> {
        let rows = sqlx::query("SELECT * FROM documents WHERE status IN ('pending', 'running') ORDER BY created_at LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to list pending documents: {e}")))?;

        rows.iter().map(Self::row_to_document).collect()
    }
}
