// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Batch Controller
//!
//! Iterates a set of documents, bounds parallelism at `max_documents`, and
//! aggregates per-document results into an overall summary. Each document
//! is dispatched to its own [`PipelineScheduler`] invocation; across
//! documents there is no ordering guarantee, and stage execution within one
//! document stays single-threaded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use docuflow_domain::entities::{Document, DocumentStatus};
use docuflow_domain::value_objects::StageName;

use crate::application::cancellation::CancellationToken;
use crate::application::config::RunMode;
use crate::application::metrics::PipelineMetrics;
use crate::application::pipeline_scheduler::{PipelineScheduler, StageResult};

/// Running totals for one stage across the batch, used to compute
/// `per_stage_stats` averages at the end.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageTally {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub retrying: usize,
}

#[derive(Debug, Clone)]
pub struct BatchStats {
    pub total: usize,
    pub by_status: HashMap<DocumentStatus, usize>,
    pub duration_seconds: f64,
    pub per_stage_stats: HashMap<StageName, StageTally>,
}

/// One document's terminal outcome within a batch run, paired with its id
/// so a caller can reconcile with the input list.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub document_id: docuflow_domain::value_objects::DocumentId,
    pub status: DocumentStatus,
}

pub struct BatchController {
    scheduler: Arc<PipelineScheduler>,
    max_documents: usize,
    metrics: Arc<dyn PipelineMetrics>,
}

impl BatchController {
    pub fn new(scheduler: Arc<PipelineScheduler>, max_documents: usize, metrics: Arc<dyn PipelineMetrics>) -> Self {
        Self {
            scheduler,
            max_documents: max_documents.max(1),
            metrics,
        }
    }

    /// Runs `documents` under `mode`, at most `max_documents` concurrently.
    /// Returns the aggregate stats plus the per-document terminal outcomes
    /// in the order their schedulers happened to finish (no ordering
    /// guarantee across documents).
    pub async fn run_batch(
        &self,
        documents: Vec<Document>,
        mode: RunMode,
        force_reprocess: bool,
        cancellation: CancellationToken,
    ) -> (BatchStats, Vec<BatchOutcome>) {
        let started = Instant::now();
        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(self.max_documents));
        let mode = Arc::new(mode);

        let mut handles = Vec::with_capacity(total);
        for document in documents {
            let scheduler = self.scheduler.clone();
            let semaphore = semaphore.clone();
            let mode = mode.clone();
            let cancellation = cancellation.clone();
            let metrics = self.metrics.clone();

            let max_documents = self.max_documents;
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let in_flight = max_documents - semaphore.available_permits();
                metrics.set_in_flight_documents(in_flight as i64);
                scheduler.run(document, &mode, force_reprocess, cancellation).await
            }));
        }

        let mut by_status: HashMap<DocumentStatus, usize> = HashMap::new();
        let mut per_stage_stats: HashMap<StageName, StageTally> = HashMap::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut failed_to_schedule = 0usize;

        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => {
                    *by_status.entry(result.document_status).or_insert(0) += 1;
                    for (stage, stage_result) in &result.per_stage_results {
                        let tally = per_stage_stats.entry(*stage).or_default();
                        match stage_result {
                            StageResult::Success => tally.succeeded += 1,
                            StageResult::Skipped => tally.skipped += 1,
                            StageResult::Failed => tally.failed += 1,
                            StageResult::Retrying => tally.retrying += 1,
                            StageResult::NotRun => {}
                        }
                    }
                    outcomes.push(BatchOutcome { document_id: result.document_id, status: result.document_status });
                }
                Ok(Err(_)) | Err(_) => {
                    // A scheduler invocation errored out (configuration
                    // misuse) or its task panicked; the document's terminal
                    // state is unknown, so it is counted only in the raw
                    // total, not in `by_status`.
                    failed_to_schedule += 1;
                }
            }
        }

        let duration_seconds = started.elapsed().as_secs_f64();
        let completed = *by_status.get(&DocumentStatus::Completed).unwrap_or(&0);
        let failed = *by_status.get(&DocumentStatus::Failed).unwrap_or(&0) + failed_to_schedule;
        self.metrics.record_batch_summary(total, completed, failed, duration_seconds);

        (
            BatchStats {
                total,
                by_status,
                duration_seconds,
                per_stage_stats,
            },
            outcomes,
        )
    }
}
