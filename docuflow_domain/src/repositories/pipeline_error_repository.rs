// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::PipelineErrorRecord;
use crate::error::DocPipeError;
use crate::value_objects::DocumentId;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence port for `pipeline_errors` rows.
#[async_trait]
pub trait PipelineErrorRepository: Send + Sync {
    async fn insert(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError>;
    async fn update(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineErrorRecord>, DocPipeError>;
    /// Reconstructs a retry chain for operator diagnostics.
    async fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<PipelineErrorRecord>, DocPipeError>;
}
