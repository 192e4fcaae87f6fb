// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Composition Root
//!
//! The only place in the whole workspace allowed to name concrete
//! infrastructure types. Everything it builds is handed to `application`
//! collaborators as `Arc<dyn Trait>`; nothing downstream of here ever
//! imports `docuflow::infrastructure` directly.
//!
//! ## Registered stages
//!
//! Only `storage` gets a real [`StageHandler`][docuflow_domain::services::StageHandler]
//! here: the text/OCR/vision/entity/embedding extractors for the other nine
//! stages are out of scope (they are pluggable stage handlers a real
//! deployment registers itself). [`StageRegistry::get`] already documents an
//! unregistered stage as "never runnable" — that is the intended behavior
//! for this reference composition root, not a gap.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use docuflow::application::config::PipelineConfig;
use docuflow::application::metrics::PipelineMetrics;
use docuflow::infrastructure::repositories::{
    self, SqliteAdvisoryLockManager, SqliteArtifactQueueRepository, SqliteCanonicalContentRepository,
    SqliteCompletionMarkerRepository, SqliteDocumentRepository, SqlitePipelineErrorRepository, SqliteRetryPolicyRepository,
    SqliteStageStatusRepository,
};
use docuflow::infrastructure::services::{CachedRetryPolicyRegistry, SqliteFileErrorLogger, SqliteStageTracker};
use docuflow::infrastructure::{FilesystemObjectStore, PrometheusMetrics};
use docuflow::{BatchController, PipelineScheduler, RetryOrchestrator, StageDescriptor, StageRegistry, StorageQueueProcessor};
use docuflow_domain::value_objects::StageName;

use crate::config::DocuflowConfig;

/// Every long-lived collaborator the CLI command handlers need, already
/// wired together. Held behind `Arc`s throughout so `main` can hand out
/// clones freely (e.g. one `PipelineScheduler` per concurrently-dispatched
/// command) without re-running the wiring.
pub struct CompositionRoot {
    pub scheduler: Arc<PipelineScheduler>,
    pub batch_controller: Arc<BatchController>,
    pub document_repo: Arc<SqliteDocumentRepository>,
    pub metrics: Arc<PrometheusMetrics>,
    pub pipeline_config: PipelineConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("failed to initialize database at {database_url}: {source}")]
    Database { database_url: String, #[source] source: sqlx::Error },
    #[error("failed to initialize object store at {root}: {source}")]
    ObjectStore { root: String, #[source] source: std::io::Error },
}

pub async fn build(config: &DocuflowConfig) -> Result<CompositionRoot, CompositionError> {
    let pool: SqlitePool = repositories::schema::initialize_database(&config.database_url)
        .await
        .map_err(|source| CompositionError::Database { database_url: config.database_url.clone(), source })?;

    std::fs::create_dir_all(&config.object_store_root).map_err(|source| CompositionError::ObjectStore {
        root: config.object_store_root.clone(),
        source,
    })?;

    let document_repo = Arc::new(SqliteDocumentRepository::new(pool.clone()));
    let stage_status_repo = Arc::new(SqliteStageStatusRepository::new(pool.clone()));
    let marker_repo = Arc::new(SqliteCompletionMarkerRepository::new(pool.clone()));
    let retry_policy_repo = Arc::new(SqliteRetryPolicyRepository::new(pool.clone()));
    let lock_manager = Arc::new(SqliteAdvisoryLockManager::new(pool.clone()));
    let error_repo = Arc::new(SqlitePipelineErrorRepository::new(pool.clone()));
    let artifact_queue_repo = Arc::new(SqliteArtifactQueueRepository::new(pool.clone()));
    let canonical_content_repo = Arc::new(SqliteCanonicalContentRepository::new(pool.clone()));

    let policy_registry = Arc::new(CachedRetryPolicyRegistry::new(retry_policy_repo, config.pipeline.policy_cache_ttl));
    let error_logger = Arc::new(SqliteFileErrorLogger::new(error_repo.clone(), error_log_dir(config)));
    let stage_tracker = Arc::new(SqliteStageTracker::new(stage_status_repo.clone()));

    let metrics = Arc::new(PrometheusMetrics::new().unwrap_or_default());
    let metrics_dyn: Arc<dyn PipelineMetrics> = metrics.clone();

    let object_store = Arc::new(FilesystemObjectStore::new(config.object_store_root.clone()));

    let storage_handler = Arc::new(StorageQueueProcessor::new(artifact_queue_repo, object_store, canonical_content_repo));

    let mut registry = StageRegistry::new();
    registry.register(StageDescriptor::new(StageName::Storage, "storage", storage_handler));
    let registry = Arc::new(registry);

    let orchestrator = Arc::new(RetryOrchestrator::new(
        policy_registry,
        marker_repo.clone(),
        lock_manager,
        error_logger,
        error_repo,
        stage_tracker,
        metrics_dyn.clone(),
    ));

    let scheduler = Arc::new(PipelineScheduler::new(
        registry,
        orchestrator,
        document_repo.clone(),
        stage_status_repo,
        marker_repo,
        metrics_dyn.clone(),
        config.pipeline.optional_stages_continue_on_failure,
    ));

    let batch_controller = Arc::new(BatchController::new(scheduler.clone(), config.pipeline.max_documents, metrics_dyn));

    Ok(CompositionRoot {
        scheduler,
        batch_controller,
        document_repo,
        metrics,
        pipeline_config: config.pipeline.clone(),
    })
}

fn error_log_dir(config: &DocuflowConfig) -> std::path::PathBuf {
    config
        .log_directory
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("./logs"))
}

/// Used by tests and the `validate-config` command, where no storage-stage
/// handler or database is needed — just the retry-policy defaults.
pub fn default_policy_cache_ttl() -> Duration {
    Duration::from_secs(60)
}
