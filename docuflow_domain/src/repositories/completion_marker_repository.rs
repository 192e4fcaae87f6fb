// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::CompletionMarker;
use crate::error::DocPipeError;
use crate::value_objects::{DocumentId, StageName};
use async_trait::async_trait;

/// Persistence port backing the idempotency store. `(document_id, stage)`
/// is a unique key; `upsert` replaces any existing marker for that key.
#[async_trait]
pub trait CompletionMarkerRepository: Send + Sync {
    async fn upsert(&self, marker: &CompletionMarker) -> Result<(), DocPipeError>;
    async fn find(&self, document_id: DocumentId, stage: StageName) -> Result<Option<CompletionMarker>, DocPipeError>;
    async fn clear(&self, document_id: DocumentId, stage: StageName) -> Result<(), DocPipeError>;
}
