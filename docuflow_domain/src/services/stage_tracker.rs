// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Tracker
//!
//! Thin service port over [`crate::repositories::StageStatusRepository`]
//! that owns the coalescing policy for progress updates: a handler may call
//! `report_progress` far more often than the scheduler wants to write rows,
//! so the tracker is the single place that decides which updates actually
//! hit the repository.

use crate::entities::{StageExecutionStatus, StageStatus};
use crate::error::DocPipeError;
use crate::value_objects::{DocumentId, Progress, StageName};

use async_trait::async_trait;

#[async_trait]
pub trait StageTracker: Send + Sync {
    async fn start(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError>;

    /// Coalesced progress update; implementations may drop updates that
    /// arrive faster than their configured flush interval, but must never
    /// drop the final update that accompanies a status transition.
    async fn report_progress(
        &self,
        document_id: DocumentId,
        stage_name: StageName,
        progress: Progress,
    ) -> Result<(), DocPipeError>;

    async fn complete(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError>;

    async fn fail(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError>;

    async fn skip(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError>;

    async fn current(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<StageStatus>, DocPipeError>;
}

/// Returned by implementations that need to report whether an update was
/// actually persisted or coalesced away, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackResult {
    Persisted,
    Coalesced,
}

impl TrackResult {
    pub fn is_terminal(status: StageExecutionStatus) -> bool {
        matches!(
            status,
            StageExecutionStatus::Completed | StageExecutionStatus::Failed | StageExecutionStatus::Skipped
        )
    }
}
