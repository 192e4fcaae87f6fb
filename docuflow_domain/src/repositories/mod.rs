//! Persistence ports. The domain depends only on these traits; concrete
//! SQLite-backed implementations live in `docuflow::infrastructure::repositories`.

pub mod artifact_queue_repository;
pub mod canonical_content_repository;
pub mod completion_marker_repository;
pub mod document_repository;
pub mod pipeline_error_repository;
pub mod retry_policy_repository;
pub mod stage_status_repository;

pub use artifact_queue_repository::ArtifactQueueRepository;
pub use canonical_content_repository::CanonicalContentRepository;
pub use completion_marker_repository::CompletionMarkerRepository;
pub use document_repository::DocumentRepository;
pub use pipeline_error_repository::PipelineErrorRepository;
pub use retry_policy_repository::RetryPolicyRepository;
pub use stage_status_repository::StageStatusRepository;
