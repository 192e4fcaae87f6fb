// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed [`CanonicalContentRepository`]: the tables the storage
//! stage drains artifact-queue entries into.

use async_trait::async_trait;
use docuflow_domain::entities::{ChunkRecord, EmbeddingRecord, ImageRecord, LinkKind, LinkRecord, VideoRecord};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::CanonicalContentRepository;
use docuflow_domain::value_objects::DocumentId;
use sqlx::{Row, SqlitePool};

pub struct SqliteCanonicalContentRepository {
    pool: SqlitePool,
}

impl SqliteCanonicalContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn link_kind_str(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Url => "url",
        LinkKind::Video => "video",
    }
}

#[async_trait]
impl CanonicalContentRepository for SqliteCanonicalContentRepository {
    async fn upsert_image(&self, record: &ImageRecord) -> Result<(), DocPipeError> {
        // Dedupe by content hash: a second entry for an identical image
        // (e.g. the same logo repeated across pages) is a no-op insert,
        // matching the object store's own "key already exists" skip.
        sqlx::query(
            "INSERT INTO document_images (id, document_id, object_key, page_number, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(content_hash) DO NOTHING",
        )
        .bind(record.id.to_string())
        .bind(record.document_id.to_string())
        .bind(&record.object_key)
        .bind(record.page_number as i64)
        .bind(record.content_hash.as_hex())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert image: {e}")))?;
        Ok(())
    }

    async fn upsert_chunk(&self, record: &ChunkRecord) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO document_chunks (id, document_id, sequence, text, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET text = excluded.text, content_hash = excluded.content_hash",
        )
        .bind(record.id.to_string())
        .bind(record.document_id.to_string())
        .bind(record.sequence as i64)
        .bind(&record.text)
        .bind(record.content_hash.as_hex())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert chunk: {e}")))?;
        Ok(())
    }

    async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<(), DocPipeError> {
        let vector_bytes: Vec<u8> = record.vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        sqlx::query(
            "INSERT INTO document_embeddings (chunk_id, document_id, model, vector, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(chunk_id) DO UPDATE SET model = excluded.model, vector = excluded.vector",
        )
        .bind(record.chunk_id.to_string())
        .bind(record.document_id.to_string())
        .bind(&record.model)
        .bind(vector_bytes)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert embedding: {e}")))?;
        Ok(())
    }

    async fn upsert_link(&self, record: &LinkRecord) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO document_links (id, document_id, url, kind, provider_name, provider_external_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                provider_name = excluded.provider_name,
                provider_external_id = excluded.provider_external_id",
        )
        .bind(record.id.to_string())
        .bind(record.document_id.to_string())
        .bind(&record.url)
        .bind(link_kind_str(record.kind))
        .bind(&record.provider_name)
        .bind(&record.provider_external_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert link: {e}")))?;
        Ok(())
    }

    async fn upsert_video(&self, record: &VideoRecord) -> Result<(), DocPipeError> {
        sqlx::query(
            "INSERT INTO document_videos (id, document_id, link_id, provider_name, provider_external_id, title, duration_seconds, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(link_id) DO UPDATE SET
                title = excluded.title,
                duration_seconds = excluded.duration_seconds",
        )
        .bind(record.id.to_string())
        .bind(record.document_id.to_string())
        .bind(record.link_id.to_string())
        .bind(&record.provider_name)
        .bind(&record.provider_external_id)
        .bind(&record.title)
        .bind(record.duration_seconds.map(|d| d as i64))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DocPipeError::database(format!("failed to upsert video: {e}")))?;
        Ok(())
    }

    async fn count_indexed_resources(&self, document_id: DocumentId) -> Result<u64, DocPipeError> {
        let doc_id = document_id.to_string();
        let mut total: i64 = 0;
        for table in ["document_images", "document_chunks", "document_embeddings", "document_links", "document_videos"] {
            let row = sqlx::query(&format!("SELECT COUNT(*) as n FROM {table} WHERE document_id = ?"))
                .bind(&doc_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DocPipeError::database(format!("failed to count {table}: {e}")))?;
            total += row.get::<i64, _>("n");
        }
        Ok(total as u64)
    }

    async fn delete_for_document(&self, document_id: DocumentId) -> Result<(), DocPipeError> {
        let doc_id = document_id.to_string();
        for table in ["document_images", "document_chunks", "document_embeddings", "document_links", "document_videos"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE document_id = ?"))
                .bind(&doc_id)
                .execute(&self.pool)
                .await
                .map_err(|e| DocPipeError::database(format!("failed to clear {table}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docuflow_domain::value_objects::ContentHash;
    use uuid::Uuid;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn upserting_the_same_image_hash_twice_does_not_duplicate_it() {
        let repo = SqliteCanonicalContentRepository::new(pool().await);
        let document_id = DocumentId::new();
        let hash = ContentHash::of(b"page-1-logo");
        let record = ImageRecord {
            id: Uuid::new_v4(),
            document_id,
            object_key: format!("{}.png", hash.as_hex()),
            page_number: 1,
            content_hash: hash.clone(),
        };
        repo.upsert_image(&record).await.unwrap();

        let mut second = record.clone();
        second.id = Uuid::new_v4();
        second.page_number = 7;
        repo.upsert_image(&second).await.unwrap();

        assert_eq!(repo.count_indexed_resources(document_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_for_document_clears_every_table() {
        let repo = SqliteCanonicalContentRepository::new(pool().await);
        let document_id = DocumentId::new();
        let chunk_id = Uuid::new_v4();
        repo.upsert_chunk(&ChunkRecord {
            id: chunk_id,
            document_id,
            sequence: 0,
            text: "hello".into(),
            content_hash: ContentHash::of(b"hello"),
        })
        .await
        .unwrap();
        repo.upsert_embedding(&EmbeddingRecord {
            chunk_id,
            document_id,
            model: "test-embed-v1".into(),
            vector: vec![0.1, 0.2, 0.3],
        })
        .await
        .unwrap();

        assert_eq!(repo.count_indexed_resources(document_id).await.unwrap(), 2);
        repo.delete_for_document(document_id).await.unwrap();
        assert_eq!(repo.count_indexed_resources(document_id).await.unwrap(), 0);
    }
}
