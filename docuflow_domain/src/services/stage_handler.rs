// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Handler Contract
//!
//! The polymorphic interface every concrete extractor (text, images,
//! classification, metadata, chunking, links, storage, embedding, search
//! indexing) implements. The handler itself never manages retries or
//! locks — that is the retry orchestrator's job; a handler just reports
//! what happened.

use crate::entities::Document;
use crate::error::DocPipeError;
use crate::value_objects::ContentHash;
use async_trait::async_trait;
use std::collections::HashMap;

/// Opaque bundle of inputs a handler gathered in [`StageHandler::prepare`].
/// Concrete handlers downcast this to whatever shape they produced; the
/// orchestrator only ever moves it between `prepare` and `execute`.
pub struct InputHandle(pub Box<dyn std::any::Any + Send>);

impl InputHandle {
    pub fn new<T: std::any::Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn downcast<T: std::any::Any>(self) -> Result<T, DocPipeError> {
        self.0
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| DocPipeError::handler_bug("stage handler input type mismatch"))
    }
}

/// Sink a handler reports progress through while `execute` runs. Progress
/// updates are coalesced by the implementation, not the handler.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `value` may be 0-100 or 0.0-1.0; the sink auto-scales.
    async fn report(&self, value: f64);
}

/// A no-op sink for handlers exercised outside the scheduler (unit tests,
/// one-off CLI invocations).
pub struct NullProgressSink;

#[async_trait]
impl ProgressSink for NullProgressSink {
    async fn report(&self, _value: f64) {}
}

/// Outcome of one `execute` call.
pub enum Outcome {
    Success { metadata: HashMap<String, serde_json::Value> },
    Skipped { reason: String },
    TransientFailure { error: DocPipeError },
    PermanentFailure { error: DocPipeError },
}

impl Outcome {
    pub fn success() -> Self {
        Outcome::Success { metadata: HashMap::new() }
    }

    pub fn success_with(metadata: HashMap<String, serde_json::Value>) -> Self {
        Outcome::Success { metadata }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped { reason: reason.into() }
    }

    pub fn transient(error: DocPipeError) -> Self {
        Outcome::TransientFailure { error }
    }

    pub fn permanent(error: DocPipeError) -> Self {
        Outcome::PermanentFailure { error }
    }
}

/// One named stage's extraction/enrichment logic.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Gathers inputs from the store. Read-only; no mutation of pipeline
    /// state happens here.
    async fn prepare(&self, document: &Document) -> Result<InputHandle, DocPipeError>;

    /// Produces outputs, reporting progress through `progress`. May be
    /// long-running.
    async fn execute(&self, input: InputHandle, progress: &dyn ProgressSink) -> Outcome;

    /// Idempotent removal of everything this stage previously wrote for
    /// `document`. Called by the scheduler before re-running a stage whose
    /// input hash changed.
    async fn cleanup_outputs(&self, document: &Document) -> Result<(), DocPipeError>;

    /// Canonical hash over the inputs this stage consumes, used by the
    /// idempotency store to decide whether a previous completion marker
    /// still applies.
    async fn input_hash(&self, document: &Document) -> Result<ContentHash, DocPipeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_handle_round_trips_the_concrete_type() {
        let handle = InputHandle::new(vec![1u8, 2, 3]);
        let bytes: Vec<u8> = handle.downcast().unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn input_handle_downcast_mismatch_is_a_handler_bug() {
        let handle = InputHandle::new(42u32);
        let result: Result<String, _> = handle.downcast();
        assert!(matches!(result, Err(DocPipeError::HandlerBug(_))));
    }
}
