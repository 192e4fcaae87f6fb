// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy Registry
//!
//! Resolves the effective [`RetryPolicy`] for a `(service, stage)` pair
//! through a fallback chain — stage-specific override, then service-wide
//! default, then the compiled-in [`RetryPolicy::default_policy`] — and
//! caches the result so the retry orchestrator is not round-tripping to the
//! repository on every attempt.

use crate::entities::RetryPolicy;
use crate::error::DocPipeError;
use crate::value_objects::StageName;

use async_trait::async_trait;

#[async_trait]
pub trait RetryPolicyRegistry: Send + Sync {
    /// Resolves the policy to use for `stage_name` calls into
    /// `service_name`, following the stage-override -> service-default ->
    /// compiled-in fallback chain.
    async fn resolve(&self, service_name: &str, stage_name: StageName) -> Result<RetryPolicy, DocPipeError>;

    /// Forces the next `resolve` for this pair to bypass the cache, used
    /// after an operator updates a policy through the `validate-config`
    /// CLI path.
    async fn invalidate(&self, service_name: &str, stage_name: StageName);
}
