// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::RetryPolicy;
use crate::error::DocPipeError;
use crate::value_objects::StageName;
use async_trait::async_trait;

/// Persistence port for operator-configured [`RetryPolicy`] rows. The
/// in-memory caching/fallback-chain behavior lives in the
/// `RetryPolicyRegistry` service port, not here; this trait is pure lookup.
#[async_trait]
pub trait RetryPolicyRepository: Send + Sync {
    async fn find_for_stage(&self, service_name: &str, stage_name: StageName) -> Result<Option<RetryPolicy>, DocPipeError>;
    async fn find_for_service(&self, service_name: &str) -> Result<Option<RetryPolicy>, DocPipeError>;
    async fn upsert(&self, policy: &RetryPolicy) -> Result<(), DocPipeError>;
}
