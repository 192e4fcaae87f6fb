// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The subset of configuration the scheduling core itself consumes.
//! Ambient configuration — logging, metrics, database URL, object-store
//! root, embedding endpoint — is layered on top of this by
//! `docuflow-bootstrap`'s configuration loader and never referenced here.

use docuflow_domain::value_objects::StageName;
use std::time::Duration;

/// How the [`crate::application::pipeline_scheduler::PipelineScheduler`]
/// selects which stages to run for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every stage, in ordinal order, respecting prerequisites.
    RunAll,
    /// Only the named stages, still respecting prerequisites.
    RunSubset(Vec<StageName>),
    /// Only stages whose completion marker is missing or stale.
    Smart,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on parallel document workers (`concurrency.max_documents`).
    pub max_documents: usize,
    /// Compiled-in default retry policy, overridable via `retry.default_*`.
    pub default_max_retries: u32,
    pub default_base_delay: Duration,
    pub default_max_delay: Duration,
    pub default_exponential_base: f64,
    pub default_jitter_enabled: bool,
    /// `policy_cache.ttl_seconds`.
    pub policy_cache_ttl: Duration,
    pub mode: RunMode,
    /// `force_reprocess`: clears completion markers for selected stages
    /// before running.
    pub force_reprocess: bool,
    /// `optional_stages.continue_on_failure`.
    pub optional_stages_continue_on_failure: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_documents: 4,
            default_max_retries: 3,
            default_base_delay: Duration::from_secs(1),
            default_max_delay: Duration::from_secs(60),
            default_exponential_base: 2.0,
            default_jitter_enabled: true,
            policy_cache_ttl: Duration::from_secs(60),
            mode: RunMode::Smart,
            force_reprocess: false,
            optional_stages_continue_on_failure: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_compiled_in_default_policy() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.default_base_delay, Duration::from_secs(1));
        assert_eq!(config.default_max_delay, Duration::from_secs(60));
        assert_eq!(config.mode, RunMode::Smart);
        assert!(config.optional_stages_continue_on_failure);
    }
}
