// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Local Embedding Facade
//!
//! A deterministic, dependency-free [`EmbeddingServiceFacade`] that derives
//! a fixed-width vector from the SHA-256 digest of the input text. It is
//! not a real embedding model — semantically unrelated chunks do not end
//! up close together — but it satisfies the contract every embedding
//! provider must (same input always returns the same vector, of the
//! declared dimension) well enough for the
//! reference/standalone deployment and for exercising the `embedding` and
//! `search_indexing` stages without a network dependency. A production
//! deployment points the composition root at a real provider's HTTP client
//! instead.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use docuflow_domain::error::DocPipeError;

use crate::application::facades::EmbeddingServiceFacade;

pub struct LocalEmbeddingFacade {
    dimension: usize,
}

impl LocalEmbeddingFacade {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for LocalEmbeddingFacade {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingServiceFacade for LocalEmbeddingFacade {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocPipeError> {
        if text.is_empty() {
            return Err(DocPipeError::invalid_input("cannot embed empty text"));
        }

        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        while vector.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_be_bytes());
            let digest = hasher.finalize();
            for byte in digest {
                if vector.len() == self.dimension {
                    break;
                }
                // Map each byte into [-1.0, 1.0] so the vector looks like a
                // normalized embedding rather than raw byte values.
                vector.push((byte as f32 / 127.5) - 1.0);
            }
            counter += 1;
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let facade = LocalEmbeddingFacade::new(32);
        let a = facade.embed("replace the fuser unit").await.unwrap();
        let b = facade.embed("replace the fuser unit").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vectors_are_exactly_the_declared_dimension() {
        let facade = LocalEmbeddingFacade::new(384);
        let vector = facade.embed("error code E-042").await.unwrap();
        assert_eq!(vector.len(), 384);
        assert_eq!(facade.dimension(), 384);
    }

    #[tokio::test]
    async fn different_text_embeds_differently() {
        let facade = LocalEmbeddingFacade::new(32);
        let a = facade.embed("paper jam").await.unwrap();
        let b = facade.embed("toner low").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn batch_matches_individual_calls() {
        let facade = LocalEmbeddingFacade::new(16);
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = facade.embed_batch(&texts).await.unwrap();
        let individually: Vec<Vec<f32>> = futures::future::join_all(texts.iter().map(|t| facade.embed(t))).await.into_iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(batch, individually);
    }
}
