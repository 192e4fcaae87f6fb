// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Metrics port the scheduling core emits through. A concrete
//! Prometheus-backed implementation lives in
//! `infrastructure::metrics::PrometheusMetrics`; tests and call sites that
//! do not care about metrics use [`NullMetrics`].

use docuflow_domain::error::ErrorCategory;
use docuflow_domain::value_objects::StageName;

pub trait PipelineMetrics: Send + Sync {
    fn record_stage_attempt(&self, stage: StageName);
    /// `category` is `None` on success, `Some` on every failure/retrying
    /// outcome.
    fn record_stage_result(&self, stage: StageName, category: Option<ErrorCategory>);
    fn observe_stage_duration(&self, stage: StageName, seconds: f64);
    fn set_in_flight_documents(&self, count: i64);
    fn set_queued_artifacts(&self, count: i64);
    fn record_batch_summary(&self, total: usize, completed: usize, failed: usize, duration_seconds: f64);
}

/// No-op implementation for unit tests and call sites that don't wire a
/// real metrics backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl PipelineMetrics for NullMetrics {
    fn record_stage_attempt(&self, _stage: StageName) {}
    fn record_stage_result(&self, _stage: StageName, _category: Option<ErrorCategory>) {}
    fn observe_stage_duration(&self, _stage: StageName, _seconds: f64) {}
    fn set_in_flight_documents(&self, _count: i64) {}
    fn set_queued_artifacts(&self, _count: i64) {}
    fn record_batch_summary(&self, _total: usize, _completed: usize, _failed: usize, _duration_seconds: f64) {}
}
