// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry
//!
//! The ordered list of [`StageDescriptor`]s the pipeline scheduler drives a
//! document through. Prerequisites are a property of the stage DAG itself
//! (see [`docuflow_domain::aggregates::prerequisites_of`]); a descriptor
//! additionally carries the concrete handler instance and the service name
//! used to resolve that stage's retry policy.

use docuflow_domain::aggregates::prerequisites_of;
use docuflow_domain::services::StageHandler;
use docuflow_domain::value_objects::StageName;
use std::collections::HashMap;
use std::sync::Arc;

/// Static configuration for one stage, paired with the handler that
/// implements it.
pub struct StageDescriptor {
    pub name: StageName,
    pub optional: bool,
    /// Looked up in the [`docuflow_domain::services::RetryPolicyRegistry`]
    /// alongside `name` to resolve the effective retry policy.
    pub service_name: String,
    pub handler: Arc<dyn StageHandler>,
}

impl StageDescriptor {
    pub fn new(name: StageName, service_name: impl Into<String>, handler: Arc<dyn StageHandler>) -> Self {
        Self {
            name,
            optional: name.is_optional(),
            service_name: service_name.into(),
            handler,
        }
    }

    pub fn prerequisites(&self) -> &'static [StageName] {
        prerequisites_of(self.name)
    }
}

/// Registry of every stage the composition root wired a handler for, keyed
/// by [`StageName`]. Iteration order always follows
/// [`StageName::ORDER`][docuflow_domain::value_objects::StageName::ORDER],
/// regardless of registration order.
#[derive(Default)]
pub struct StageRegistry {
    descriptors: HashMap<StageName, Arc<StageDescriptor>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: StageDescriptor) {
        self.descriptors.insert(descriptor.name, Arc::new(descriptor));
    }

    pub fn get(&self, name: StageName) -> Option<Arc<StageDescriptor>> {
        self.descriptors.get(&name).cloned()
    }

    /// Every registered stage, in canonical pipeline order. A composition
    /// root that omits a stage (e.g. running without `link_extraction`
    /// wired) simply sees a shorter list; the scheduler treats an
    /// unregistered stage as never runnable.
    ///
    /// Returns owned `Arc` clones (cheap — one refcount bump each) so
    /// callers can hand a descriptor to a spawned background-retry task
    /// without borrowing from the registry.
    pub fn ordered(&self) -> Vec<Arc<StageDescriptor>> {
        StageName::ORDER.iter().filter_map(|name| self.descriptors.get(name).cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docuflow_domain::entities::Document;
    use docuflow_domain::error::DocPipeError;
    use docuflow_domain::services::stage_handler::{InputHandle, Outcome, ProgressSink};
    use docuflow_domain::value_objects::ContentHash;

    struct NoopHandler;

    #[async_trait]
    impl StageHandler for NoopHandler {
        async fn prepare(&self, _document: &Document) -> Result<InputHandle, DocPipeError> {
            Ok(InputHandle::new(()))
        }
        async fn execute(&self, _input: InputHandle, _progress: &dyn ProgressSink) -> Outcome {
            Outcome::success()
        }
        async fn cleanup_outputs(&self, _document: &Document) -> Result<(), DocPipeError> {
            Ok(())
        }
        async fn input_hash(&self, _document: &Document) -> Result<ContentHash, DocPipeError> {
            Ok(ContentHash::of(b""))
        }
    }

    #[test]
    fn ordered_returns_registered_stages_in_canonical_order_not_registration_order() {
        let mut registry = StageRegistry::new();
        registry.register(StageDescriptor::new(StageName::Embedding, "embedding-svc", Arc::new(NoopHandler)));
        registry.register(StageDescriptor::new(StageName::Upload, "upload-svc", Arc::new(NoopHandler)));

        let ordered: Vec<StageName> = registry.ordered().iter().map(|d| d.name).collect();
        assert_eq!(ordered, vec![StageName::Upload, StageName::Embedding]);
    }

    #[test]
    fn unregistered_stage_is_absent_from_ordered() {
        let registry = StageRegistry::new();
        assert!(registry.ordered().is_empty());
        assert!(registry.get(StageName::Upload).is_none());
    }
}
