// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Orchestrator
//!
//! Wraps a single stage execution with idempotency checking, advisory-lock
//! acquisition, classification, synchronous first-retry, and background
//! retry scheduling. This is the hard part of the core: it is the only
//! place that decides whether a handler actually runs.
//!
//! The attempt loop never recurses into its own future — recursing would
//! require boxing an async fn's self-referential future for no benefit.
//! Instead [`RetryOrchestrator::run`] loops in place for the attempt==0
//! synchronous retry and, for attempt>0, spawns a fresh top-level task that
//! re-enters [`RetryOrchestrator::run_from_attempt`] after sleeping; the
//! spawner returns `Retrying` without awaiting that task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use docuflow_domain::entities::{CompletionMarker, Document, PipelineErrorRecord, RetryPolicy};
use docuflow_domain::error::{classify, DocPipeError};
use docuflow_domain::repositories::{CompletionMarkerRepository, PipelineErrorRepository};
use docuflow_domain::services::stage_handler::{Outcome, ProgressSink};
use docuflow_domain::services::{AdvisoryLockManager, ErrorLogger, RetryPolicyRegistry, StageTracker};
use docuflow_domain::value_objects::{CorrelationId, DocumentId, Progress, RequestId, StageName};

use crate::application::cancellation::CancellationToken;
use crate::application::metrics::PipelineMetrics;
use crate::application::stage_registry::StageDescriptor;

/// What the scheduler should do after one `run` call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    Skipped,
    /// Another worker holds the lock, the stage was scheduled for a later
    /// background retry, or a cancellation arrived mid-attempt. The
    /// scheduler stops advancing this document; it will be picked up again
    /// later (by a future scheduler invocation, or by the background task
    /// this call may have spawned).
    Retrying,
    PermanentFailure,
}

pub struct RetryOrchestrator {
    policy_registry: Arc<dyn RetryPolicyRegistry>,
    marker_repo: Arc<dyn CompletionMarkerRepository>,
    lock_manager: Arc<dyn AdvisoryLockManager>,
    error_logger: Arc<dyn ErrorLogger>,
    error_repo: Arc<dyn PipelineErrorRepository>,
    stage_tracker: Arc<dyn StageTracker>,
    metrics: Arc<dyn PipelineMetrics>,
    /// (document, stage) pairs that have already triggered the one-time
    /// fractional-progress warning.
    warned_fractional_progress: Mutex<HashSet<(DocumentId, StageName)>>,
}

/// Internal result of one attempt; distinct from [`StageOutcome`] so the
/// loop in [`RetryOrchestrator::run_from_attempt`] can tell "stop and
/// retry synchronously" apart from "stop and return to the caller".
enum AttemptResult {
    Success,
    Skipped,
    Coordination,
    Terminal,
    SyncRetry { error_id: Uuid },
    BackgroundRetry { error_id: Uuid, delay: Duration },
    Cancelled,
}

struct TrackerProgressSink<'a> {
    tracker: Arc<dyn StageTracker>,
    document_id: DocumentId,
    stage: StageName,
    warned: &'a Mutex<HashSet<(DocumentId, StageName)>>,
}

#[async_trait::async_trait]
impl ProgressSink for TrackerProgressSink<'_> {
    async fn report(&self, value: f64) {
        let (progress, scaled) = Progress::from_raw(value);
        if scaled && self.warned.lock().insert((self.document_id, self.stage)) {
            warn!(
                document_id = %self.document_id,
                stage = %self.stage,
                raw_value = value,
                "stage reported progress on a 0-1 fractional scale; auto-scaling to 0-100"
            );
        }
        // Progress persistence is best-effort; a dropped update here never
        // blocks the handler, and the orchestrator still delivers a final
        // update on every terminal transition via `complete`/`fail`/`skip`.
        let _ = self.tracker.report_progress(self.document_id, self.stage, progress).await;
    }
}

impl RetryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy_registry: Arc<dyn RetryPolicyRegistry>,
        marker_repo: Arc<dyn CompletionMarkerRepository>,
        lock_manager: Arc<dyn AdvisoryLockManager>,
        error_logger: Arc<dyn ErrorLogger>,
        error_repo: Arc<dyn PipelineErrorRepository>,
        stage_tracker: Arc<dyn StageTracker>,
        metrics: Arc<dyn PipelineMetrics>,
    ) -> Self {
        Self {
            policy_registry,
            marker_repo,
            lock_manager,
            error_logger,
            error_repo,
            stage_tracker,
            metrics,
            warned_fractional_progress: Mutex::new(HashSet::new()),
        }
    }

    /// Entry point: runs `descriptor` for `document`, starting at attempt 0.
    pub async fn run(
        self: Arc<Self>,
        descriptor: Arc<StageDescriptor>,
        document: Document,
        request_id: RequestId,
        cancellation: CancellationToken,
    ) -> StageOutcome {
        self.run_from_attempt(descriptor, document, request_id, 0, None, cancellation).await
    }

    async fn run_from_attempt(
        self: Arc<Self>,
        descriptor: Arc<StageDescriptor>,
        document: Document,
        request_id: RequestId,
        mut attempt: u32,
        mut last_error_id: Option<Uuid>,
        cancellation: CancellationToken,
    ) -> StageOutcome {
        let policy = match self.policy_registry.resolve(&descriptor.service_name, descriptor.name).await {
            Ok(policy) => policy,
            Err(_) => RetryPolicy::default_policy(&descriptor.service_name),
        };

        loop {
            if cancellation.is_cancelled() {
                self.stage_tracker
                    .fail(document.id, descriptor.name, "cancelled".to_string())
                    .await
                    .ok();
                return StageOutcome::Retrying;
            }

            let span = info_span!(
                "stage_attempt",
                document_id = %document.id,
                stage = %descriptor.name,
                attempt,
                request_id = %request_id,
            );

            let started = std::time::Instant::now();
            self.metrics.record_stage_attempt(descriptor.name);
            let result = self
                .try_once(&descriptor, &document, request_id, attempt, &policy, last_error_id.take(), &cancellation)
                .instrument(span)
                .await;
            self.metrics.observe_stage_duration(descriptor.name, started.elapsed().as_secs_f64());

            match result {
                AttemptResult::Success => {
                    self.metrics.record_stage_result(descriptor.name, None);
                    return StageOutcome::Success;
                }
                AttemptResult::Skipped => {
                    self.metrics.record_stage_result(descriptor.name, None);
                    return StageOutcome::Skipped;
                }
                AttemptResult::Coordination => {
                    self.metrics.record_stage_result(
                        descriptor.name,
                        Some(docuflow_domain::error::ErrorCategory::Coordination),
                    );
                    return StageOutcome::Retrying;
                }
                AttemptResult::Cancelled => {
                    self.metrics
                        .record_stage_result(descriptor.name, Some(docuflow_domain::error::ErrorCategory::Cancelled));
                    return StageOutcome::Retrying;
                }
                AttemptResult::Terminal => {
                    return StageOutcome::PermanentFailure;
                }
                AttemptResult::SyncRetry { error_id } => {
                    self.metrics.record_stage_result(
                        descriptor.name,
                        Some(docuflow_domain::error::ErrorCategory::ExternalTransient),
                    );
                    tokio::time::sleep(policy.base_delay).await;
                    attempt += 1;
                    last_error_id = Some(error_id);
                    continue;
                }
                AttemptResult::BackgroundRetry { error_id, delay } => {
                    self.metrics.record_stage_result(
                        descriptor.name,
                        Some(docuflow_domain::error::ErrorCategory::ExternalTransient),
                    );
                    let orchestrator = self.clone();
                    let next_attempt = attempt + 1;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        orchestrator
                            .run_from_attempt(descriptor, document, request_id, next_attempt, Some(error_id), cancellation)
                            .await;
                    });
                    return StageOutcome::Retrying;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_once(
        &self,
        descriptor: &Arc<StageDescriptor>,
        document: &Document,
        request_id: RequestId,
        attempt: u32,
        policy: &RetryPolicy,
        last_error_id: Option<Uuid>,
        cancellation: &CancellationToken,
    ) -> AttemptResult {
        let current_hash = match descriptor.handler.input_hash(document).await {
            Ok(hash) => hash,
            Err(err) => return self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, err).await,
        };

        if let Ok(Some(marker)) = self.marker_repo.find(document.id, descriptor.name).await {
            if marker.matches(&current_hash) {
                return AttemptResult::Success;
            }
            // Inputs changed since the last success: the handler must undo
            // whatever it previously wrote before we let it run again.
            if let Err(err) = descriptor.handler.cleanup_outputs(document).await {
                return self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, err).await;
            }
            self.marker_repo.clear(document.id, descriptor.name).await.ok();
        }

        let token = match self.lock_manager.try_acquire(document.id, descriptor.name).await {
            Ok(Some(token)) => token,
            Ok(None) => return AttemptResult::Coordination,
            Err(err) => return self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, err).await,
        };

        if cancellation.is_cancelled() {
            self.lock_manager.release(document.id, descriptor.name, token).await.ok();
            return AttemptResult::Cancelled;
        }

        self.stage_tracker.start(document.id, descriptor.name).await.ok();

        let input = match descriptor.handler.prepare(document).await {
            Ok(input) => input,
            Err(err) => {
                self.lock_manager.release(document.id, descriptor.name, token).await.ok();
                return self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, err).await;
            }
        };

        let sink = TrackerProgressSink {
            tracker: self.stage_tracker.clone(),
            document_id: document.id,
            stage: descriptor.name,
            warned: &self.warned_fractional_progress,
        };

        let outcome = descriptor.handler.execute(input, &sink).await;

        match outcome {
            Outcome::Success { metadata } => {
                let marker = CompletionMarker::new(document.id, descriptor.name, current_hash).with_metadata(metadata);
                if let Err(err) = self.marker_repo.upsert(&marker).await {
                    self.lock_manager.release(document.id, descriptor.name, token).await.ok();
                    return self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, err).await;
                }
                self.stage_tracker.complete(document.id, descriptor.name).await.ok();
                self.lock_manager.release(document.id, descriptor.name, token).await.ok();
                self.resolve_error_chain(last_error_id).await;
                AttemptResult::Success
            }
            Outcome::Skipped { reason } => {
                self.stage_tracker.skip(document.id, descriptor.name, reason).await.ok();
                self.lock_manager.release(document.id, descriptor.name, token).await.ok();
                self.resolve_error_chain(last_error_id).await;
                AttemptResult::Skipped
            }
            Outcome::TransientFailure { error } | Outcome::PermanentFailure { error } => {
                self.lock_manager.release(document.id, descriptor.name, token).await.ok();
                self.handle_failure(descriptor, document, request_id, attempt, policy, last_error_id, error).await
            }
        }
    }

    /// Classifies `error`, logs it, and decides whether the chain is done
    /// (permanent, or the retry budget is exhausted) or should continue
    /// (synchronously for the first retry, in the background after that).
    #[allow(clippy::too_many_arguments)]
    async fn handle_failure(
        &self,
        descriptor: &Arc<StageDescriptor>,
        document: &Document,
        request_id: RequestId,
        attempt: u32,
        policy: &RetryPolicy,
        last_error_id: Option<Uuid>,
        error: DocPipeError,
    ) -> AttemptResult {
        let classification = classify(&error);
        let correlation_id = CorrelationId::new(request_id, descriptor.name, attempt);

        let mut record = PipelineErrorRecord::new(
            document.id,
            descriptor.name,
            classification.category,
            error.to_string(),
            None,
            attempt,
            policy.max_retries,
            correlation_id,
        );

        // One error row per attempt; `last_error_id` only threads the id of
        // the *previous* attempt's row forward so a later success/terminal
        // outcome can resolve it, it never causes this attempt's row to be
        // skipped.
        let _ = last_error_id;
        self.error_logger.log_failure(&record).await.ok();

        let terminal = !classification.is_transient || attempt >= policy.max_retries;
        if terminal {
            record.mark_failed();
            self.error_repo.update(&record).await.ok();
            self.stage_tracker.fail(document.id, descriptor.name, error.to_string()).await.ok();
            return AttemptResult::Terminal;
        }

        if attempt == 0 {
            record.mark_retrying(Utc::now() + chrono::Duration::from_std(policy.base_delay).unwrap_or_default());
            self.error_repo.update(&record).await.ok();
            return AttemptResult::SyncRetry { error_id: record.id };
        }

        let mut delay = policy.backoff_for_attempt(attempt);
        if policy.jitter_enabled {
            let factor = rand::rng().random_range(0.5..=1.5);
            delay = Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0));
        }
        record.mark_retrying(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
        self.error_repo.update(&record).await.ok();
        AttemptResult::BackgroundRetry { error_id: record.id, delay }
    }

    async fn resolve_error_chain(&self, last_error_id: Option<Uuid>) {
        let Some(error_id) = last_error_id else { return };
        if let Ok(Some(mut record)) = self.error_repo.find_by_id(error_id).await {
            record.mark_resolved();
            self.error_repo.update(&record).await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    //! Exercises the orchestrator end to end against in-memory fakes of
    //! every port.

    use super::*;
    use async_trait::async_trait;
    use docuflow_domain::entities::{PipelineErrorStatus, StageStatus};
    use docuflow_domain::services::stage_handler::{InputHandle, NullProgressSink};
    use docuflow_domain::services::{LockToken, StageHandler};
    use docuflow_domain::value_objects::ContentHash;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    // --- fakes -------------------------------------------------------------

    #[derive(Default)]
    struct InMemoryMarkers(Mutex<HashMap<(DocumentId, StageName), CompletionMarker>>);

    #[async_trait]
    impl CompletionMarkerRepository for InMemoryMarkers {
        async fn upsert(&self, marker: &CompletionMarker) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().insert((marker.document_id, marker.stage), marker.clone());
            Ok(())
        }
        async fn find(&self, document_id: DocumentId, stage: StageName) -> Result<Option<CompletionMarker>, DocPipeError> {
            Ok(self.0.lock().unwrap().get(&(document_id, stage)).cloned())
        }
        async fn clear(&self, document_id: DocumentId, stage: StageName) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().remove(&(document_id, stage));
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryLocks(Mutex<std::collections::HashSet<(DocumentId, StageName)>>);

    #[async_trait]
    impl AdvisoryLockManager for InMemoryLocks {
        async fn try_acquire(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<LockToken>, DocPipeError> {
            let mut held = self.0.lock().unwrap();
            if held.insert((document_id, stage_name)) {
                Ok(Some(LockToken::new()))
            } else {
                Ok(None)
            }
        }
        async fn release(&self, document_id: DocumentId, stage_name: StageName, _token: LockToken) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().remove(&(document_id, stage_name));
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryErrors(Mutex<HashMap<Uuid, PipelineErrorRecord>>);

    #[async_trait]
    impl ErrorLogger for InMemoryErrors {
        async fn log_failure(&self, record: &PipelineErrorRecord) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().insert(record.id, record.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl PipelineErrorRepository for InMemoryErrors {
        async fn insert(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().insert(error.id, error.clone());
            Ok(())
        }
        async fn update(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().insert(error.id, error.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineErrorRecord>, DocPipeError> {
            Ok(self.0.lock().unwrap().get(&id).cloned())
        }
        async fn list_for_document(&self, document_id: DocumentId) -> Result<Vec<PipelineErrorRecord>, DocPipeError> {
            Ok(self.0.lock().unwrap().values().filter(|e| e.document_id == document_id).cloned().collect())
        }
    }

    #[derive(Default)]
    struct InMemoryTracker(Mutex<HashMap<(DocumentId, StageName), StageStatus>>);

    #[async_trait]
    impl StageTracker for InMemoryTracker {
        async fn start(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError> {
            let mut guard = self.0.lock().unwrap();
            let status = guard.entry((document_id, stage_name)).or_insert_with(|| StageStatus::new(document_id, stage_name));
            status.start();
            Ok(())
        }
        async fn report_progress(&self, document_id: DocumentId, stage_name: StageName, progress: Progress) -> Result<(), DocPipeError> {
            if let Some(status) = self.0.lock().unwrap().get_mut(&(document_id, stage_name)) {
                status.update_progress(progress);
            }
            Ok(())
        }
        async fn complete(&self, document_id: DocumentId, stage_name: StageName) -> Result<(), DocPipeError> {
            let mut guard = self.0.lock().unwrap();
            let status = guard.entry((document_id, stage_name)).or_insert_with(|| StageStatus::new(document_id, stage_name));
            status.complete(HashMap::new());
            Ok(())
        }
        async fn fail(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError> {
            let mut guard = self.0.lock().unwrap();
            let status = guard.entry((document_id, stage_name)).or_insert_with(|| StageStatus::new(document_id, stage_name));
            status.fail(reason);
            Ok(())
        }
        async fn skip(&self, document_id: DocumentId, stage_name: StageName, reason: String) -> Result<(), DocPipeError> {
            let mut guard = self.0.lock().unwrap();
            let status = guard.entry((document_id, stage_name)).or_insert_with(|| StageStatus::new(document_id, stage_name));
            status.skip(reason);
            Ok(())
        }
        async fn current(&self, document_id: DocumentId, stage_name: StageName) -> Result<Option<StageStatus>, DocPipeError> {
            Ok(self.0.lock().unwrap().get(&(document_id, stage_name)).cloned())
        }
    }

    struct FixedPolicyRegistry(RetryPolicy);

    #[async_trait]
    impl RetryPolicyRegistry for FixedPolicyRegistry {
        async fn resolve(&self, _service_name: &str, _stage_name: StageName) -> Result<RetryPolicy, DocPipeError> {
            Ok(self.0.clone())
        }
        async fn invalidate(&self, _service_name: &str, _stage_name: StageName) {}
    }

    /// Succeeds only after `fail_until` prior invocations (1-indexed
    /// attempt count), always as a transient failure.
    struct FlakyHandler {
        fail_until: u32,
        invocations: AtomicU32,
    }

    #[async_trait]
    impl StageHandler for FlakyHandler {
        async fn prepare(&self, _document: &Document) -> Result<InputHandle, DocPipeError> {
            Ok(InputHandle::new(()))
        }
        async fn execute(&self, _input: InputHandle, _progress: &dyn ProgressSink) -> Outcome {
            let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_until {
                Outcome::transient(DocPipeError::external_transient("503"))
            } else {
                Outcome::success()
            }
        }
        async fn cleanup_outputs(&self, _document: &Document) -> Result<(), DocPipeError> {
            Ok(())
        }
        async fn input_hash(&self, document: &Document) -> Result<ContentHash, DocPipeError> {
            Ok(ContentHash::of(document.id.to_string().as_bytes()))
        }
    }

    struct AlwaysPermanentHandler;

    #[async_trait]
    impl StageHandler for AlwaysPermanentHandler {
        async fn prepare(&self, _document: &Document) -> Result<InputHandle, DocPipeError> {
            Ok(InputHandle::new(()))
        }
        async fn execute(&self, _input: InputHandle, _progress: &dyn ProgressSink) -> Outcome {
            Outcome::permanent(DocPipeError::invalid_input("corrupt file"))
        }
        async fn cleanup_outputs(&self, _document: &Document) -> Result<(), DocPipeError> {
            Ok(())
        }
        async fn input_hash(&self, document: &Document) -> Result<ContentHash, DocPipeError> {
            Ok(ContentHash::of(document.id.to_string().as_bytes()))
        }
    }

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            service_name: "test".into(),
            stage_name: None,
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
            exponential_base: 2.0,
            jitter_enabled: false,
        }
    }

    fn harness(
        handler: Arc<dyn StageHandler>,
        policy: RetryPolicy,
    ) -> (Arc<RetryOrchestrator>, Arc<InMemoryErrors>, Arc<InMemoryMarkers>, Arc<StageDescriptor>) {
        let markers = Arc::new(InMemoryMarkers::default());
        let locks = Arc::new(InMemoryLocks::default());
        let errors = Arc::new(InMemoryErrors::default());
        let tracker = Arc::new(InMemoryTracker::default());
        let registry = Arc::new(FixedPolicyRegistry(policy));
        let orchestrator = Arc::new(RetryOrchestrator::new(
            registry,
            markers.clone(),
            locks,
            errors.clone(),
            errors.clone(),
            tracker,
            Arc::new(crate::application::metrics::NullMetrics),
        ));
        let descriptor = Arc::new(StageDescriptor::new(StageName::Embedding, "embedding", handler));
        (orchestrator, errors, markers, descriptor)
    }

    #[tokio::test]
    async fn transient_failure_recovers_on_the_synchronous_retry() {
        let handler = Arc::new(FlakyHandler { fail_until: 1, invocations: AtomicU32::new(0) });
        let (orchestrator, errors, markers, descriptor) = harness(handler, test_policy());
        let document = Document::new("manual.pdf", ContentHash::of(b"bytes"));
        let request_id = RequestId::new();

        let outcome = orchestrator.run(descriptor.clone(), document.clone(), request_id, CancellationToken::new()).await;

        assert_eq!(outcome, StageOutcome::Success);
        assert!(markers.0.lock().unwrap().contains_key(&(document.id, StageName::Embedding)));

        let rows = errors.list_for_document(document.id).await.unwrap();
        assert_eq!(rows.len(), 1, "exactly one PipelineError row");
        assert_eq!(rows[0].retry_attempt, 0);
        assert_eq!(rows[0].status, PipelineErrorStatus::Resolved);
        assert_eq!(rows[0].category, docuflow_domain::error::ErrorCategory::ExternalTransient);
    }

    #[tokio::test]
    async fn transient_failure_exhausting_retries_fails_after_max_retries_plus_one_attempts() {
        let handler = Arc::new(FlakyHandler { fail_until: 100, invocations: AtomicU32::new(0) });
        let policy = test_policy();
        let (orchestrator, errors, _markers, descriptor) = harness(handler.clone(), policy.clone());
        let document = Document::new("manual.pdf", ContentHash::of(b"bytes"));
        let request_id = RequestId::new();

        // Attempt 0 runs inline (sync retry); attempts 1..=max_retries are
        // scheduled as background tasks. Drive them to completion by
        // sleeping past the (tiny, test-tuned) backoff delays.
        let outcome = orchestrator.run(descriptor.clone(), document.clone(), request_id, CancellationToken::new()).await;
        assert_eq!(outcome, StageOutcome::Retrying);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let rows = errors.list_for_document(document.id).await.unwrap();
        assert_eq!(rows.len(), (policy.max_retries + 1) as usize);
        let mut attempts: Vec<u32> = rows.iter().map(|r| r.retry_attempt).collect();
        attempts.sort_unstable();
        assert_eq!(attempts, vec![0, 1, 2, 3]);
        assert!(rows.iter().all(|r| r.status == PipelineErrorStatus::Failed));
        assert_eq!(handler.invocations.load(Ordering::SeqCst), policy.max_retries + 1);
    }

    #[tokio::test]
    async fn permanent_failure_never_retries() {
        let handler = Arc::new(AlwaysPermanentHandler);
        let (orchestrator, errors, _markers, descriptor) = harness(handler, test_policy());
        let document = Document::new("corrupt.pdf", ContentHash::of(b"garbage"));
        let request_id = RequestId::new();

        let outcome = orchestrator.run(descriptor.clone(), document.clone(), request_id, CancellationToken::new()).await;

        assert_eq!(outcome, StageOutcome::PermanentFailure);
        let rows = errors.list_for_document(document.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].retry_attempt, 0);
        assert_eq!(rows[0].status, PipelineErrorStatus::Failed);
    }

    #[tokio::test]
    async fn mutual_exclusion_the_loser_observes_retrying_without_invoking_the_handler() {
        let handler = Arc::new(FlakyHandler { fail_until: 0, invocations: AtomicU32::new(0) });
        let locks = Arc::new(InMemoryLocks::default());
        let document = Document::new("manual.pdf", ContentHash::of(b"bytes"));
        // Simulate a second worker already holding the lock.
        locks.0.lock().unwrap().insert((document.id, StageName::Embedding));

        let markers = Arc::new(InMemoryMarkers::default());
        let errors = Arc::new(InMemoryErrors::default());
        let tracker = Arc::new(InMemoryTracker::default());
        let registry = Arc::new(FixedPolicyRegistry(test_policy()));
        let orchestrator = Arc::new(RetryOrchestrator::new(
            registry,
            markers,
            locks,
            errors.clone(),
            errors.clone(),
            tracker,
            Arc::new(crate::application::metrics::NullMetrics),
        ));
        let descriptor = Arc::new(StageDescriptor::new(StageName::Embedding, "embedding", handler.clone()));

        let outcome = orchestrator.run(descriptor, document.clone(), RequestId::new(), CancellationToken::new()).await;

        assert_eq!(outcome, StageOutcome::Retrying);
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0, "handler.execute must not run while locked");
        assert!(errors.list_for_document(document.id).await.unwrap().is_empty(), "lock contention logs no PipelineError row");
    }

    #[tokio::test]
    async fn idempotence_reuses_the_marker_without_re_invoking_the_handler() {
        let handler = Arc::new(FlakyHandler { fail_until: 0, invocations: AtomicU32::new(0) });
        let (orchestrator, _errors, markers, descriptor) = harness(handler.clone(), test_policy());
        let document = Document::new("manual.pdf", ContentHash::of(b"bytes"));

        let first = orchestrator.run(descriptor.clone(), document.clone(), RequestId::new(), CancellationToken::new()).await;
        assert_eq!(first, StageOutcome::Success);
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);

        let second = orchestrator.run(descriptor.clone(), document.clone(), RequestId::new(), CancellationToken::new()).await;
        assert_eq!(second, StageOutcome::Success);
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1, "unchanged input hash must not re-invoke the handler");
        assert!(markers.0.lock().unwrap().contains_key(&(document.id, StageName::Embedding)));
    }
}
