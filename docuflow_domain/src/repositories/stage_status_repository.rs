// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::StageStatus;
use crate::error::DocPipeError;
use crate::value_objects::{DocumentId, StageName};
use async_trait::async_trait;

/// Persistence port for per-(document, stage) [`StageStatus`] rows.
#[async_trait]
pub trait StageStatusRepository: Send + Sync {
    async fn upsert(&self, status: &StageStatus) -> Result<(), DocPipeError>;
    async fn find(&self, document_id: DocumentId, stage: StageName) -> Result<Option<StageStatus>, DocPipeError>;
    /// All statuses recorded for a document, used by the scheduler's smart
    /// mode to decide what is left to run.
    async fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<StageStatus>, DocPipeError>;
}
