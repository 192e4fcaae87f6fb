// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Ephemeral rows produced by upstream stages and drained by the storage
//! stage into the object store and canonical tables.

use crate::value_objects::{DocumentId, StageName};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Chunk,
    Embedding,
    Link,
    Video,
}

/// One pending artifact awaiting persistence. `payload` carries either raw
/// bytes (images) or a JSON-encoded row draft (everything else); the
/// storage stage handler decides how to interpret it per `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactQueueEntry {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub producing_stage: StageName,
    pub kind: ArtifactKind,
    pub payload: Vec<u8>,
}

impl ArtifactQueueEntry {
    pub fn new(document_id: DocumentId, producing_stage: StageName, kind: ArtifactKind, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            producing_stage,
            kind,
            payload,
        }
    }
}
