// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus Metrics
//!
//! Concrete [`PipelineMetrics`] backed by a dedicated [`prometheus::Registry`],
//! exposed for scraping through [`PrometheusMetrics::render`]. Every metric
//! is namespaced `docuflow_` so it doesn't collide with whatever else the
//! operator's process exports.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use tracing::warn;

use docuflow_domain::error::ErrorCategory;
use docuflow_domain::value_objects::StageName;

use crate::application::metrics::PipelineMetrics;

pub struct PrometheusMetrics {
    registry: Registry,
    stage_attempts_total: IntCounterVec,
    stage_results_total: IntCounterVec,
    stage_duration_seconds: HistogramVec,
    in_flight_documents: IntGauge,
    queued_artifacts: IntGauge,
    batch_documents_total: IntCounterVec,
    batch_duration_seconds: Histogram,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let stage_attempts_total = IntCounterVec::new(
            Opts::new("docuflow_stage_attempts_total", "Stage handler invocations, by stage").namespace("docuflow"),
            &["stage"],
        )?;
        let stage_results_total = IntCounterVec::new(
            Opts::new("docuflow_stage_results_total", "Stage attempt outcomes, by stage and error category")
                .namespace("docuflow"),
            &["stage", "category"],
        )?;
        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new("docuflow_stage_duration_seconds", "Stage attempt wall-clock duration")
                .namespace("docuflow")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["stage"],
        )?;
        let in_flight_documents =
            IntGauge::with_opts(Opts::new("docuflow_in_flight_documents", "Documents currently being scheduled").namespace("docuflow"))?;
        let queued_artifacts =
            IntGauge::with_opts(Opts::new("docuflow_queued_artifacts", "Artifact-queue rows awaiting storage").namespace("docuflow"))?;
        let batch_documents_total = IntCounterVec::new(
            Opts::new("docuflow_batch_documents_total", "Documents completed by a batch run, by terminal status").namespace("docuflow"),
            &["status"],
        )?;
        let batch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("docuflow_batch_duration_seconds", "Total wall-clock duration of a batch run")
                .namespace("docuflow")
                .buckets(vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0]),
        )?;

        registry.register(Box::new(stage_attempts_total.clone()))?;
        registry.register(Box::new(stage_results_total.clone()))?;
        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(in_flight_documents.clone()))?;
        registry.register(Box::new(queued_artifacts.clone()))?;
        registry.register(Box::new(batch_documents_total.clone()))?;
        registry.register(Box::new(batch_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            stage_attempts_total,
            stage_results_total,
            stage_duration_seconds,
            in_flight_documents,
            queued_artifacts,
            batch_documents_total,
            batch_duration_seconds,
        })
    }

    /// Text-exposition-format rendering of every registered metric, for a
    /// `/metrics` HTTP endpoint.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families)
    }

    fn category_label(category: Option<ErrorCategory>) -> &'static str {
        match category {
            None => "none",
            Some(ErrorCategory::InputInvalid) => "input_invalid",
            Some(ErrorCategory::ExternalTransient) => "external_transient",
            Some(ErrorCategory::ExternalPermanent) => "external_permanent",
            Some(ErrorCategory::HandlerBug) => "handler_bug",
            Some(ErrorCategory::Coordination) => "coordination",
            Some(ErrorCategory::Cancelled) => "cancelled",
        }
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new().unwrap_or_else(|err| {
            // A registration failure here means two metrics collided on the
            // same name, which is a programmer error, not an operational
            // one; fall back to an empty registry so the process can still
            // start rather than panicking in a constructor.
            warn!(error = %err, "failed to construct Prometheus registry; metrics will not be collected");
            Self {
                registry: Registry::new(),
                stage_attempts_total: IntCounterVec::new(Opts::new("noop_attempts", "noop"), &["stage"]).unwrap(),
                stage_results_total: IntCounterVec::new(Opts::new("noop_results", "noop"), &["stage", "category"]).unwrap(),
                stage_duration_seconds: HistogramVec::new(HistogramOpts::new("noop_duration", "noop"), &["stage"]).unwrap(),
                in_flight_documents: IntGauge::new("noop_in_flight", "noop").unwrap(),
                queued_artifacts: IntGauge::new("noop_queued", "noop").unwrap(),
                batch_documents_total: IntCounterVec::new(Opts::new("noop_batch", "noop"), &["status"]).unwrap(),
                batch_duration_seconds: Histogram::with_opts(HistogramOpts::new("noop_batch_duration", "noop")).unwrap(),
            }
        })
    }
}

impl PipelineMetrics for PrometheusMetrics {
    fn record_stage_attempt(&self, stage: StageName) {
        self.stage_attempts_total.with_label_values(&[stage.as_str()]).inc();
    }

    fn record_stage_result(&self, stage: StageName, category: Option<ErrorCategory>) {
        self.stage_results_total
            .with_label_values(&[stage.as_str(), Self::category_label(category)])
            .inc();
    }

    fn observe_stage_duration(&self, stage: StageName, seconds: f64) {
        self.stage_duration_seconds.with_label_values(&[stage.as_str()]).observe(seconds);
    }

    fn set_in_flight_documents(&self, count: i64) {
        self.in_flight_documents.set(count);
    }

    fn set_queued_artifacts(&self, count: i64) {
        self.queued_artifacts.set(count);
    }

    fn record_batch_summary(&self, total: usize, completed: usize, failed: usize, duration_seconds: f64) {
        self.batch_documents_total.with_label_values(&["completed"]).inc_by(completed as u64);
        self.batch_documents_total.with_label_values(&["failed"]).inc_by(failed as u64);
        let other = total.saturating_sub(completed).saturating_sub(failed);
        self.batch_documents_total.with_label_values(&["other"]).inc_by(other as u64);
        self.batch_duration_seconds.observe(duration_seconds);
    }
}

/// Shared handle suitable for cloning into the scheduler, orchestrator, and
/// batch controller, all of which expect an `Arc<dyn PipelineMetrics>`.
pub fn shared() -> Arc<PrometheusMetrics> {
    Arc::new(PrometheusMetrics::default())
}
