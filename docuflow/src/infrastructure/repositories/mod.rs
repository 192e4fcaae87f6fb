//! Concrete SQLite-backed adapters for the domain's repository and
//! advisory-lock service ports. Only the composition root names these
//! types directly.

pub mod advisory_lock_repository;
pub mod artifact_queue_repository;
pub mod canonical_content_repository;
pub mod completion_marker_repository;
pub mod document_repository;
pub mod pipeline_error_repository;
pub mod retry_policy_repository;
pub mod schema;
pub mod stage_status_repository;

pub use advisory_lock_repository::SqliteAdvisoryLockManager;
pub use artifact_queue_repository::SqliteArtifactQueueRepository;
pub use canonical_content_repository::SqliteCanonicalContentRepository;
pub use completion_marker_repository::SqliteCompletionMarkerRepository;
pub use document_repository::SqliteDocumentRepository;
pub use pipeline_error_repository::SqlitePipelineErrorRepository;
pub use retry_policy_repository::SqliteRetryPolicyRepository;
pub use stage_status_repository::SqliteStageStatusRepository;
