// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::{ChunkRecord, EmbeddingRecord, ImageRecord, LinkRecord, VideoRecord};
use crate::error::DocPipeError;
use crate::value_objects::DocumentId;
use async_trait::async_trait;

/// Persistence port for the canonical rows the storage stage writes.
/// Each `upsert_*` is idempotent on its own natural key so
/// draining the same artifact-queue entry twice (e.g. after a crash
/// between persisting and `remove`) never creates a duplicate row.
#[async_trait]
pub trait CanonicalContentRepository: Send + Sync {
    /// Keyed by `content_hash`: an image already stored under that hash is
    /// left untouched, matching the object store's own dedupe-by-hash.
    async fn upsert_image(&self, record: &ImageRecord) -> Result<(), DocPipeError>;
    async fn upsert_chunk(&self, record: &ChunkRecord) -> Result<(), DocPipeError>;
    /// Keyed by `chunk_id`.
    async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<(), DocPipeError>;
    async fn upsert_link(&self, record: &LinkRecord) -> Result<(), DocPipeError>;
    async fn upsert_video(&self, record: &VideoRecord) -> Result<(), DocPipeError>;

    /// Counts rows across every canonical table for `document_id`, used by
    /// the `search_indexing` stage to compute its indexed-resource summary.
    async fn count_indexed_resources(&self, document_id: DocumentId) -> Result<u64, DocPipeError>;

    /// Idempotent removal of everything this stage wrote for `document_id`,
    /// used by [`crate::services::StageHandler::cleanup_outputs`] when the
    /// storage stage's own inputs change.
    async fn delete_for_document(&self, document_id: DocumentId) -> Result<(), DocPipeError>;
}
