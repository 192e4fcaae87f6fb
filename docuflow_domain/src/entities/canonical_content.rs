// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The canonical rows the storage stage drains
//! [`crate::entities::ArtifactQueueEntry`] rows into: one shape per
//! [`crate::entities::ArtifactKind`]. Upstream stages never write these
//! directly — they enqueue artifact entries and the storage stage is the
//! only writer of these tables.

use crate::value_objects::{ContentHash, DocumentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A page image, content-addressed and deduplicated by `content_hash`
/// before a blob is ever written to the object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub object_key: String,
    pub page_number: u32,
    pub content_hash: ContentHash,
}

/// One semantic chunk produced by the chunking stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub sequence: u32,
    pub text: String,
    pub content_hash: ContentHash,
}

/// An embedding vector for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: Uuid,
    pub document_id: DocumentId,
    pub model: String,
    pub vector: Vec<f32>,
}

/// A URL or recognized video reference extracted from the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Url,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub url: String,
    pub kind: LinkKind,
    /// Populated only for `kind == Video`, by the (optional, best-effort)
    /// video-provider enrichment sub-stage.
    pub provider_name: Option<String>,
    pub provider_external_id: Option<String>,
}

/// Metadata fetched from an external video provider for one recognized
/// video reference. A separate row from [`LinkRecord`] so enrichment can
/// fail or be retried independently of the link extraction that found the
/// reference in the first place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub link_id: Uuid,
    pub provider_name: String,
    pub provider_external_id: String,
    pub title: Option<String>,
    pub duration_seconds: Option<u32>,
}
