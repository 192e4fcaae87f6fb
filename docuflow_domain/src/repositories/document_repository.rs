// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::Document;
use crate::error::DocPipeError;
use crate::value_objects::{ContentHash, DocumentId};
use async_trait::async_trait;

/// Persistence port for [`Document`] rows.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn save(&self, document: &Document) -> Result<(), DocPipeError>;
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DocPipeError>;
    /// Used by `upload` to dedupe against an existing document with the
    /// same content hash before creating a new row.
    async fn find_by_content_hash(&self, hash: &ContentHash) -> Result<Option<Document>, DocPipeError>;
    async fn list_pending(&self, limit: usize) -> Result<Vec<Document>, DocPipeError>;
}
