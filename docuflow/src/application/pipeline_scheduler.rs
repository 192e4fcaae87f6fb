// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Scheduler
//!
//! Drives one [`Document`] through the stage DAG. Single-threaded per
//! document — the [`BatchController`][crate::application::batch_controller::BatchController]
//! is what runs many documents in parallel. For each stage selected by the
//! configured [`RunMode`], the scheduler checks prerequisites, delegates
//! execution to the [`RetryOrchestrator`], and interprets the result:
//! `Success`/`Skipped` advance, `Retrying` stops this invocation (a later
//! one picks the document back up), and a required-stage permanent failure
//! fails the document outright while an optional-stage one is recorded and
//! the scheduler continues or stops depending on
//! `optional_stages_continue_on_failure`.

use std::collections::HashMap;
use std::sync::Arc;

use docuflow_domain::aggregates::DocumentAggregate;
use docuflow_domain::entities::Document;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::{CompletionMarkerRepository, DocumentRepository, StageStatusRepository};
use docuflow_domain::value_objects::{DocumentId, RequestId, StageName};

use crate::application::cancellation::CancellationToken;
use crate::application::config::RunMode;
use crate::application::metrics::PipelineMetrics;
use crate::application::retry_orchestrator::{RetryOrchestrator, StageOutcome};
use crate::application::stage_registry::StageRegistry;

/// Outcome recorded for a single stage within one scheduler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageResult {
    Success,
    Skipped,
    Retrying,
    Failed,
    /// Never selected to run this invocation (prerequisite unmet in
    /// `run_subset`, or not chosen by `smart`/`run_all` gating).
    NotRun,
}

/// Terminal outcome of one scheduler invocation: the document's final
/// status, what happened to each stage, and the request id every stage
/// attempt this invocation was correlated under.
#[derive(Debug, Clone)]
pub struct SchedulerResult {
    pub document_id: DocumentId,
    pub document_status: docuflow_domain::entities::DocumentStatus,
    pub per_stage_results: HashMap<StageName, StageResult>,
    pub request_id: RequestId,
}

pub struct PipelineScheduler {
    registry: Arc<StageRegistry>,
    orchestrator: Arc<RetryOrchestrator>,
    document_repo: Arc<dyn DocumentRepository>,
    stage_status_repo: Arc<dyn StageStatusRepository>,
    marker_repo: Arc<dyn CompletionMarkerRepository>,
    metrics: Arc<dyn PipelineMetrics>,
    optional_stages_continue_on_failure: bool,
}

impl PipelineScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<StageRegistry>,
        orchestrator: Arc<RetryOrchestrator>,
        document_repo: Arc<dyn DocumentRepository>,
        stage_status_repo: Arc<dyn StageStatusRepository>,
        marker_repo: Arc<dyn CompletionMarkerRepository>,
        metrics: Arc<dyn PipelineMetrics>,
        optional_stages_continue_on_failure: bool,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            document_repo,
            stage_status_repo,
            marker_repo,
            metrics,
            optional_stages_continue_on_failure,
        }
    }

    /// Runs `document` to completion (or until it stops advancing) under
    /// `mode`, honoring `force_reprocess` by clearing the completion markers
    /// of every stage `mode` could touch — including ones already marked
    /// complete — before stage selection runs, so a forced re-run actually
    /// reaches stages `smart` mode would otherwise consider done.
    pub async fn run(
        &self,
        mut document: Document,
        mode: &RunMode,
        force_reprocess: bool,
        cancellation: CancellationToken,
    ) -> Result<SchedulerResult, DocPipeError> {
        let request_id = RequestId::new();
        let statuses = self.stage_status_repo.list_for_document(document.id).await?;
        let mut aggregate = DocumentAggregate::load(document.clone(), statuses);

        if force_reprocess {
            for stage in self.candidate_stages(&aggregate, mode) {
                self.marker_repo.clear(document.id, stage).await.ok();
            }
        }

        let selected = self.select_stages(&aggregate, mode, &document).await?;

        let mut per_stage_results = HashMap::new();
        let mut advanced_any = false;
        let mut failed_required = false;

        for stage in StageName::ORDER {
            if !selected.contains(&stage) {
                per_stage_results.insert(stage, StageResult::NotRun);
                continue;
            }

            let Some(descriptor) = self.registry.get(stage) else {
                per_stage_results.insert(stage, StageResult::NotRun);
                continue;
            };

            if !aggregate.prerequisites_met(stage) {
                // `run_subset` is the only mode that can reach this with an
                // explicitly-selected stage; any other mode only selects
                // stages whose gate `select_stages` already confirmed open.
                return Err(DocPipeError::configuration(format!(
                    "stage {stage} selected for run_subset but its prerequisites are incomplete for document {}",
                    document.id
                )));
            }

            if !advanced_any {
                document.mark_running();
                self.document_repo.save(&document).await?;
                advanced_any = true;
            }

            let outcome = self
                .orchestrator
                .clone()
                .run(descriptor.clone(), document.clone(), request_id, cancellation.clone())
                .await;

            match outcome {
                StageOutcome::Success => {
                    per_stage_results.insert(stage, StageResult::Success);
                    let mut status = self.stage_status_repo.find(document.id, stage).await?.unwrap_or_else(|| {
                        docuflow_domain::entities::StageStatus::new(document.id, stage)
                    });
                    status.complete(Default::default());
                    aggregate.record_status(status);
                }
                StageOutcome::Skipped => {
                    per_stage_results.insert(stage, StageResult::Skipped);
                    let mut status = self.stage_status_repo.find(document.id, stage).await?.unwrap_or_else(|| {
                        docuflow_domain::entities::StageStatus::new(document.id, stage)
                    });
                    status.skip("handler reported skipped");
                    aggregate.record_status(status);
                }
                StageOutcome::Retrying => {
                    per_stage_results.insert(stage, StageResult::Retrying);
                    return self.finish(document, request_id, per_stage_results).await;
                }
                StageOutcome::PermanentFailure => {
                    per_stage_results.insert(stage, StageResult::Failed);
                    let mut status = self.stage_status_repo.find(document.id, stage).await?.unwrap_or_else(|| {
                        docuflow_domain::entities::StageStatus::new(document.id, stage)
                    });
                    status.fail("stage failed permanently");
                    aggregate.record_status(status);

                    if !stage.is_optional() || !self.optional_stages_continue_on_failure {
                        failed_required = true;
                        break;
                    }
                }
            }
        }

        if failed_required {
            document.mark_failed();
            self.document_repo.save(&document).await?;
            return self.finish(document, request_id, per_stage_results).await;
        }

        if advanced_any {
            document.mark_completed();
            document.mark_search_ready();
            self.document_repo.save(&document).await?;
        }

        self.finish(document, request_id, per_stage_results).await
    }

    async fn finish(
        &self,
        document: Document,
        request_id: RequestId,
        per_stage_results: HashMap<StageName, StageResult>,
    ) -> Result<SchedulerResult, DocPipeError> {
        self.metrics.set_in_flight_documents(0);
        Ok(SchedulerResult {
            document_id: document.id,
            document_status: document.status,
            per_stage_results,
            request_id,
        })
    }

    /// Every stage `mode` could possibly touch for this document, gated
    /// only by prerequisites — not by whether the stage already has a
    /// terminal status. Used to decide which completion markers
    /// `force_reprocess` must clear, since that has to happen before
    /// [`Self::select_stages`] narrows the set down to what actually needs
    /// to run.
    fn candidate_stages(&self, aggregate: &DocumentAggregate, mode: &RunMode) -> Vec<StageName> {
        match mode {
            RunMode::RunAll | RunMode::Smart => {
                StageName::ORDER.into_iter().filter(|&stage| aggregate.prerequisites_met(stage)).collect()
            }
            RunMode::RunSubset(stages) => stages.iter().copied().filter(|&stage| aggregate.prerequisites_met(stage)).collect(),
        }
    }

    /// Resolves `mode` into the concrete set of stages to attempt this
    /// invocation.
    async fn select_stages(
        &self,
        aggregate: &DocumentAggregate,
        mode: &RunMode,
        document: &Document,
    ) -> Result<Vec<StageName>, DocPipeError> {
        match mode {
            RunMode::RunAll => Ok(StageName::ORDER.to_vec()),
            RunMode::RunSubset(stages) => {
                let mut selected = Vec::new();
                for &stage in stages {
                    if aggregate.prerequisites_met(stage) {
                        selected.push(stage);
                    }
                    // A stage whose prerequisites are unmet is silently
                    // dropped here (flagged by the caller via tracing); the
                    // run loop's own prerequisite check above is the
                    // authoritative guard against a mis-ordered explicit
                    // selection that slips past this filter.
                }
                Ok(selected)
            }
            RunMode::Smart => {
                let mut selected = aggregate.runnable_stages();
                for stage in StageName::ORDER {
                    if selected.contains(&stage) || !aggregate.prerequisites_met(stage) {
                        continue;
                    }
                    // `runnable_stages` already excluded this stage because
                    // its status is terminal; re-select it anyway if its
                    // completion marker no longer matches the current
                    // input, since a terminal status only means the stage
                    // ran once, not that its output is still valid.
                    if self.stage_is_stale(stage, document).await? {
                        selected.push(stage);
                    }
                }
                Ok(selected)
            }
        }
    }

    /// Whether `stage`'s stored completion marker is missing or no longer
    /// matches `document`'s current input hash. An unregistered stage is
    /// never stale — it was never runnable in the first place.
    async fn stage_is_stale(&self, stage: StageName, document: &Document) -> Result<bool, DocPipeError> {
        let Some(descriptor) = self.registry.get(stage) else {
            return Ok(false);
        };
        let current_hash = descriptor.handler.input_hash(document).await?;
        match self.marker_repo.find(document.id, stage).await? {
            Some(marker) => Ok(!marker.matches(&current_hash)),
            None => Ok(true),
        }
    }
}
