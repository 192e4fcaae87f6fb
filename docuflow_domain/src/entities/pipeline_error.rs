// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Persisted record of one failed (or recovered) stage attempt.

use crate::error::ErrorCategory;
use crate::value_objects::{CorrelationId, DocumentId, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorStatus {
    Pending,
    Retrying,
    Resolved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineErrorRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub stage: StageName,
    pub category: ErrorCategory,
    pub message: String,
    pub stack: Option<String>,
    pub retry_attempt: u32,
    pub max_retries: u32,
    pub status: PipelineErrorStatus,
    pub correlation_id: CorrelationId,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineErrorRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_id: DocumentId,
        stage: StageName,
        category: ErrorCategory,
        message: impl Into<String>,
        stack: Option<String>,
        retry_attempt: u32,
        max_retries: u32,
        correlation_id: CorrelationId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            document_id,
            stage,
            category,
            message: message.into(),
            stack,
            retry_attempt,
            max_retries,
            status: PipelineErrorStatus::Pending,
            correlation_id,
            next_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_retrying(&mut self, next_retry_at: DateTime<Utc>) {
        self.status = PipelineErrorStatus::Retrying;
        self.next_retry_at = Some(next_retry_at);
        self.updated_at = Utc::now();
    }

    pub fn mark_resolved(&mut self) {
        self.status = PipelineErrorStatus::Resolved;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self) {
        self.status = PipelineErrorStatus::Failed;
        self.updated_at = Utc::now();
    }
}
