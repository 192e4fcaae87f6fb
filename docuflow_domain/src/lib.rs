// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Docuflow Domain
//!
//! The document-processing-pipeline domain: the business rules of ingesting
//! a technical PDF through a fixed DAG of enrichment stages (upload, text
//! extraction, image processing, classification, metadata extraction,
//! chunking, link extraction, storage, embedding, search indexing), free of
//! any database, filesystem, HTTP client, or async-runtime dependency.
//!
//! ## Module Structure
//!
//! ### Value Objects
//! Small immutable types with no identity of their own: [`DocumentId`],
//! [`value_objects::StageName`], [`value_objects::ContentHash`],
//! [`value_objects::CorrelationId`]/[`value_objects::RequestId`],
//! [`value_objects::Progress`].
//!
//! ### Entities
//! Mutable, identity-bearing objects with a lifecycle: [`entities::Document`],
//! [`entities::StageStatus`], [`entities::CompletionMarker`],
//! [`entities::RetryPolicy`], [`entities::PipelineErrorRecord`],
//! [`entities::ArtifactQueueEntry`].
//!
//! ### Aggregates
//! [`aggregates::DocumentAggregate`] owns the one cross-cutting invariant in
//! this domain: which stages are runnable given the prerequisite DAG and
//! the current settled status of every other stage for a document.
//!
//! ### Repositories
//! Persistence ports the domain depends on but never implements; concrete
//! SQLite-backed adapters live in `docuflow::infrastructure::repositories`.
//!
//! ### Services
//! Stateless collaborator ports: [`services::StageHandler`] (the contract
//! every concrete extractor implements), [`services::AdvisoryLockManager`],
//! [`services::ErrorLogger`], [`services::StageTracker`],
//! [`services::RetryPolicyRegistry`].
//!
//! ### Error
//! [`error::DocPipeError`], the single error enum for the whole domain, and
//! [`error::classify`], the pure function mapping an error to its
//! closed-vocabulary [`error::ErrorCategory`].

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use aggregates::DocumentAggregate;
pub use error::DocPipeError;
pub use value_objects::{ContentHash, CorrelationId, DocumentId, Progress, RequestId, StageName};
