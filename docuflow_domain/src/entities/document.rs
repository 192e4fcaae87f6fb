// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The `Document` entity: one ingested PDF and its pipeline-level status.

use crate::value_objects::{ContentHash, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document-level processing status. Transitions pending -> running ->
/// (completed | failed) and never moves backward within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source_filename: String,
    pub content_hash: ContentHash,
    pub manufacturer: Option<String>,
    pub document_type: Option<String>,
    pub status: DocumentStatus,
    pub search_ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a freshly-ingested document, prior to any stage running.
    pub fn new(source_filename: impl Into<String>, content_hash: ContentHash) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            source_filename: source_filename.into(),
            content_hash,
            manufacturer: None,
            document_type: None,
            status: DocumentStatus::Pending,
            search_ready: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_running(&mut self) {
        if self.status == DocumentStatus::Pending {
            self.status = DocumentStatus::Running;
            self.updated_at = Utc::now();
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = DocumentStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self) {
        self.status = DocumentStatus::Failed;
        self.updated_at = Utc::now();
    }

    pub fn mark_search_ready(&mut self) {
        self.search_ready = true;
        self.updated_at = Utc::now();
    }
}
