//! The scheduling core: stage registry, retry orchestrator, pipeline
//! scheduler, batch controller, storage queue processor, and the facade
//! traits used to reach external collaborators that only the core (not the
//! stage handlers) calls directly.

pub mod batch_controller;
pub mod cancellation;
pub mod config;
pub mod facades;
pub mod metrics;
pub mod pipeline_scheduler;
pub mod retry_orchestrator;
pub mod stage_registry;
pub mod storage_queue_processor;

pub use cancellation::CancellationToken;
pub use config::PipelineConfig;
pub use metrics::{NullMetrics, PipelineMetrics};
pub use storage_queue_processor::StorageQueueProcessor;
