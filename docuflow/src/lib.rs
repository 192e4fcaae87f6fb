// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Docuflow
//!
//! Application and infrastructure layers for the document processing
//! pipeline. The domain (`docuflow-domain`) declares the entities, value
//! objects, and service ports; this crate wires concrete collaborators
//! (SQLite repositories, a filesystem object store, an embedding facade)
//! behind those ports and drives them through the stage registry, retry
//! orchestrator, pipeline scheduler, batch controller, and storage queue
//! processor.
//!
//! ## Module Structure
//!
//! - [`application`]: the scheduling core — stage registry, retry
//!   orchestrator, pipeline scheduler, batch controller, storage queue
//!   processor, and the facade traits the core uses to reach external
//!   collaborators.
//! - [`infrastructure`]: concrete adapters — SQLite-backed repositories and
//!   domain-service implementations, a content-addressed filesystem object
//!   store, a local embedding facade, and the Prometheus metrics registry.
//!
//! Only the composition root (in `docuflow-bootstrap`) is allowed to name
//! the concrete types under `infrastructure` directly; everything else in
//! this crate and in `docuflow-domain` depends on traits.

pub mod application;
pub mod infrastructure;

pub use application::batch_controller::{BatchController, BatchOutcome, BatchStats};
pub use application::config::RunMode;
pub use application::pipeline_scheduler::{PipelineScheduler, SchedulerResult, StageResult};
pub use application::retry_orchestrator::{RetryOrchestrator, StageOutcome};
pub use application::stage_registry::{StageDescriptor, StageRegistry};
pub use application::storage_queue_processor::StorageQueueProcessor;
