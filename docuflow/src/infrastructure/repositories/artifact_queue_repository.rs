// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`ArtifactQueueRepository`].

use async_trait::async_trait;
use docuflow_domain::entities::{ArtifactKind, ArtifactQueueEntry};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::ArtifactQueueRepository;
use docuflow_domain::value_objects::{DocumentId, StageName};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

pub struct SqliteArtifactQueueRepository {
    pool: SqlitePool,
}

impl SqliteArtifactQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_kind(s: &str) -> Result<ArtifactKind, DocPipeError> {
    match s {
        "image" => Ok(ArtifactKind::Image),
        "chunk" => Ok(ArtifactKind::Chunk),
        "embedding" => Ok(ArtifactKind::Embedding),
        "link" => Ok(ArtifactKind::Link),
        "video" => Ok(ArtifactKind::Video),
        other => Err(DocPipeError::database(format!("unknown artifact kind: {other}"))),
    }
}

fn kind_str(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Image => "image",
        ArtifactKind::Chunk => "chunk",
        ArtifactKind::Embedding => "embedding",
        ArtifactKind::Link => "link",
        ArtifactKind::Video => "video",
    }
}

#[async_trait]
impl ArtifactQueueRepository for SqliteArtifactQueueRepository {
    async fn enqueue(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO artifact_queue (id, document_id, producing_stage, kind, payload, enqueued_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.document_id.to_string())
        .bind(entry.producing_stage.as_str())
        .bind(kind_str(entry.kind))
        .bind(&entry.payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to enqueue artifact: {e}")))?;

        Ok(())
    }

    async fn peek_pending(&self, document_id: DocumentId, limit: usize) -> Result<Vec<ArtifactQueueEntry>, DocPipeError> {
        let rows = sqlx::query("SELECT * FROM artifact_queue WHERE document_id = ? ORDER BY enqueued_at LIMIT ?")
            .bind(document_id.to_string())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to peek artifact queue: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let producing_stage: String = row.get("producing_stage");
                let kind: String = row.get("kind");
                Ok(ArtifactQueueEntry {
                    id: Uuid::parse_str(&id).map_err(|e| DocPipeError::database(format!("corrupt artifact id: {e}")))?,
                    document_id,
                    producing_stage: StageName::from_str(&producing_stage).map_err(|e| DocPipeError::database(format!("corrupt stage name: {e}")))?,
                    kind: parse_kind(&kind)?,
                    payload: row.get("payload"),
                })
            })
            .collect()
    }

    async fn remove(&self, id: Uuid) -> Result<(), DocPipeError> {
        sqlx::query("DELETE FROM artifact_queue WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DocPipeError::database(format!("failed to remove artifact: {e}")))?;

        Ok(())
    }
}
