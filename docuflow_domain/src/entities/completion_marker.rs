// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Idempotency record: proof that a stage has already succeeded for a given
//! document against a given set of inputs.

use crate::value_objects::{ContentHash, DocumentId, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub document_id: DocumentId,
    pub stage: StageName,
    pub data_hash: ContentHash,
    pub completed_at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CompletionMarker {
    pub fn new(document_id: DocumentId, stage: StageName, data_hash: ContentHash) -> Self {
        Self {
            document_id,
            stage,
            data_hash,
            completed_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether a previously-stored marker is still valid for the current
    /// input hash; false means the stage must re-run.
    pub fn matches(&self, current_hash: &ContentHash) -> bool {
        &self.data_hash == current_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_hash_it_was_stamped_with() {
        let hash = ContentHash::of(b"input-v1");
        let marker = CompletionMarker::new(DocumentId::new(), StageName::Chunking, hash.clone());
        assert!(marker.matches(&hash));
        assert!(!marker.matches(&ContentHash::of(b"input-v2")));
    }
}
