// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Retry/backoff parameters, resolved per (service, stage).

use crate::value_objects::StageName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub service_name: String,
    pub stage_name: Option<StageName>,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter_enabled: bool,
}

impl RetryPolicy {
    /// The compiled-in fallback used when nothing more specific is
    /// registered for a (service, stage) pair.
    pub fn default_policy(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            stage_name: None,
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter_enabled: true,
        }
    }

    /// `min(base_delay * exponential_base^attempt, max_delay)`, before
    /// jitter. Jitter itself is applied by the retry orchestrator, which
    /// owns the random source; this keeps the policy a pure data object.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.exponential_base.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}
