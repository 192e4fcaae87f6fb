// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The embedding service: `embed(text) -> vector` of a fixed dimension
//! declared by policy. The endpoint is opaque to the core; production
//! deployments point this at whatever provider the operator configures.

use async_trait::async_trait;
use docuflow_domain::error::DocPipeError;

#[async_trait]
pub trait EmbeddingServiceFacade: Send + Sync {
    /// Declared vector width; every call to `embed` returns a vector of
    /// exactly this length.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocPipeError>;

    /// Batched form, used by the `embedding` stage to bound request counts.
    /// The default implementation calls [`Self::embed`] per item; an
    /// implementation backed by a provider with a native batch endpoint
    /// should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocPipeError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
