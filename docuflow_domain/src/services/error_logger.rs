// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Error Logger
//!
//! Durable record of every stage failure, independent of whatever
//! structured-logging sink `tracing` is currently wired to. The scheduler
//! calls this on every failed attempt, transient or permanent, so a
//! `pipeline_errors` row always exists alongside the retry chain's
//! correlation IDs, even if the process crashes before the next retry.

use crate::entities::PipelineErrorRecord;
use crate::error::DocPipeError;

use async_trait::async_trait;

#[async_trait]
pub trait ErrorLogger: Send + Sync {
    /// Persists one failed attempt. Implementations are expected to never
    /// fail this call in a way that aborts the caller's stage — logging a
    /// failure must not itself become a new failure the scheduler has to
    /// reason about.
    async fn log_failure(&self, record: &PipelineErrorRecord) -> Result<(), DocPipeError>;
}
