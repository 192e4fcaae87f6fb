// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Stage Tracker
//!
//! Wraps [`StageStatusRepository`] with a coalescing policy: a handler may
//! call `report_progress` many times a second, but only a progress delta of
//! at least [`Self::MIN_PROGRESS_DELTA`] (or the configured minimum
//! interval) actually reaches the repository. Every terminal transition
//! (`start`, `complete`, `fail`, `skip`) always writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use docuflow_domain::entities::{StageStatus, StageStatus as DomainStageStatus};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::StageStatusRepository;
use docuflow_domain::services::{StageTracker, TrackResult};
use docuflow_domain::value_objects::{DocumentId, Progress, StageName};

struct Coalesce {
    last_written: Progress,
    last_write_at: Instant,
}

pub struct SqliteStageTracker {
    repository: Arc<dyn StageStatusRepository>,
    min_delta: u8,
    min_interval: Duration,
    coalesce_state: Mutex<HashMap<(DocumentId, StageName), Coalesce>>,
}

impl SqliteStageTracker {
    /// A write is forced once progress has moved by at least this many
    /// percentage points since the last persisted value.
    const DEFAULT_MIN_DELTA: u8 = 5;
    /// ...or once this long has passed since the last persisted value,
    /// whichever comes first.
    const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(repository: Arc<dyn StageStatusRepository>) -> Self {
        Self {
            repository,
            min_delta: Self::DEFAULT_MIN_DELTA,
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            coalesce_state: Mutex::new(HashMap::new()),
        }
    }

    async fn load_or_new(&self, document_id: DocumentId, stage_name: StageName) -> Result<DomainStageStatus, DocPipeError> {
        match self.repository.find(document_id, stage_name).await? {
            Some(status) => Ok(status),
            None => Ok(StageStatus::new(document_id, stage_name)),
        }
    }

    fn clear_coalesce(&self, key: (DocumentId, StageName)) {
        self.coalesce_state.lock().remove(&key);
    }
}

#[async_trait]
impl StageTracker for SqliteStageTracker {
    async fn start(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError> {
        let mut status = self.load_or_new(document_id, stage_name).await?;
        status.start();
        self.repository.upsert(&status).await?;
        self.clear_coalesce((document_id, stage_name));
        Ok(())
    }

    async fn report_progress(&self, document_id: DocumentId, stage_name: StageName, progress: Progress) -> Result<(), DocPipeError> {
        let key = (document_id, stage_name);
        let should_write = {
            let mut guard = self.coalesce_state.lock();
            let write = match guard.get(&key) {
                Some(existing) => {
                    let delta = progress.value().abs_diff(existing.last_written.value());
                    delta >= self.min_delta || existing.last_write_at.elapsed() >= self.min_interval || progress.is_complete()
                }
                None => true,
            };
            if write {
                guard.insert(
                    key,
                    Coalesce {
                        last_written: progress,
                        last_write_at: Instant::now(),
                    },
                );
            }
            write
        };

        if !should_write {
            return Ok(());
        }

        let mut status = self.load_or_new(document_id, stage_name).await?;
        status.update_progress(progress);
        self.repository.upsert(&status).await?;
        Ok(())
    }

    async fn complete(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError> {
        let mut status = self.load_or_new(document_id, stage_name).await?;
        status.complete(HashMap::new());
        self.repository.upsert(&status).await?;
        self.clear_coalesce((document_id, stage_name));
        Ok(())
    }

    async fn fail(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError> {
        let mut status = self.load_or_new(document_id, stage_name).await?;
        status.fail(reason);
        self.repository.upsert(&status).await?;
        self.clear_coalesce((document_id, stage_name));
        Ok(())
    }

    async fn skip(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError> {
        let mut status = self.load_or_new(document_id, stage_name).await?;
        status.skip(reason);
        self.repository.upsert(&status).await?;
        self.clear_coalesce((document_id, stage_name));
        Ok(())
    }

    async fn current(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<DomainStageStatus>, DocPipeError> {
        self.repository.find(document_id, stage_name).await
    }
}

/// Exposed for metrics/tests that want to know whether the last
/// `report_progress` call actually persisted or was coalesced away.
impl SqliteStageTracker {
    pub fn last_write_result(&self, document_id: DocumentId, stage_name: StageName, progress: Progress) -> TrackResult {
        let guard = self.coalesce_state.lock();
        match guard.get(&(document_id, stage_name)) {
            Some(entry) if entry.last_written == progress => TrackResult::Persisted,
            _ => TrackResult::Coalesced,
        }
    }
}
