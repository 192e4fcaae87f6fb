// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::ArtifactQueueEntry;
use crate::error::DocPipeError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence port for the ephemeral artifact queue the storage stage
/// drains.
#[async_trait]
pub trait ArtifactQueueRepository: Send + Sync {
    async fn enqueue(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError>;
    /// Pops up to `limit` entries for one document, oldest first. Entries
    /// are not removed until [`Self::remove`] is called for them, so a
    /// crash mid-drain leaves them to be retried.
    async fn peek_pending(&self, document_id: crate::value_objects::DocumentId, limit: usize) -> Result<Vec<ArtifactQueueEntry>, DocPipeError>;
    async fn remove(&self, id: Uuid) -> Result<(), DocPipeError>;
}
