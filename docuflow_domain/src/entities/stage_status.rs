// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-(document, stage) execution record.

use crate::value_objects::{DocumentId, Progress, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    pub document_id: DocumentId,
    pub stage: StageName,
    pub status: StageExecutionStatus,
    pub progress: Progress,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub attempt: u32,
}

impl StageStatus {
    pub fn new(document_id: DocumentId, stage: StageName) -> Self {
        Self {
            document_id,
            stage,
            status: StageExecutionStatus::Pending,
            progress: Progress::ZERO,
            started_at: None,
            completed_at: None,
            last_error: None,
            metadata: HashMap::new(),
            attempt: 0,
        }
    }

    pub fn start(&mut self) {
        self.status = StageExecutionStatus::Running;
        self.started_at.get_or_insert_with(Utc::now);
    }

    pub fn update_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    pub fn complete(&mut self, metadata: HashMap<String, serde_json::Value>) {
        self.status = StageExecutionStatus::Completed;
        self.progress = Progress::COMPLETE;
        self.completed_at = Some(Utc::now());
        self.metadata = metadata;
        self.last_error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = StageExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(message.into());
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = StageExecutionStatus::Skipped;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(reason.into());
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, StageExecutionStatus::Completed | StageExecutionStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_status_is_pending_with_zero_progress() {
        let s = StageStatus::new(DocumentId::new(), StageName::Upload);
        assert_eq!(s.status, StageExecutionStatus::Pending);
        assert_eq!(s.progress, Progress::ZERO);
        assert_eq!(s.attempt, 0);
    }

    #[test]
    fn complete_sets_progress_to_100_and_clears_error() {
        let mut s = StageStatus::new(DocumentId::new(), StageName::Upload);
        s.fail("transient");
        s.complete(HashMap::new());
        assert!(s.progress.is_complete());
        assert!(s.last_error.is_none());
        assert!(s.is_complete());
    }

    #[test]
    fn skip_counts_as_complete_for_gating_purposes() {
        let mut s = StageStatus::new(DocumentId::new(), StageName::LinkExtraction);
        s.skip("no links found");
        assert!(s.is_complete());
    }
}
