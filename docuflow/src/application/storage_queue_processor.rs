// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Storage Queue Processor
//!
//! The `storage` stage's [`StageHandler`] implementation: drains
//! [`ArtifactQueueEntry`] rows written by the upstream enrichment stages
//! into the object store and the canonical content tables, then removes
//! each entry. It is a stage handler like any other — the retry
//! orchestrator wraps it with the same idempotency/lock/retry machinery as
//! every other stage.
//!
//! ## Payload wire format
//!
//! `image` payloads are `[page_number: u32 big-endian][raw image bytes]`.
//! Every other kind's payload is a JSON row draft matching the
//! corresponding `*Record` shape in [`docuflow_domain::entities::canonical_content`],
//! with ids as lowercase-hyphenated UUID strings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use docuflow_domain::entities::{
    ArtifactKind, ArtifactQueueEntry, ChunkRecord, Document, EmbeddingRecord, ImageRecord, LinkKind, LinkRecord, VideoRecord,
};
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::{ArtifactQueueRepository, CanonicalContentRepository};
use docuflow_domain::services::stage_handler::{InputHandle, Outcome, ProgressSink, StageHandler};
use docuflow_domain::value_objects::ContentHash;

use crate::application::facades::ObjectStoreFacade;

/// How many artifact-queue entries one `execute` call drains at most. A
/// partial drain is not a failure — the remaining entries stay queued and
/// a later invocation (this stage re-selected by the scheduler) picks them
/// back up, since the completion marker is only set once the queue is
/// empty.
const BATCH_LIMIT: usize = 500;

/// Images are stored as PNG regardless of their original page-render
/// format; the upstream `image_processing` stage is responsible for
/// producing PNG-encoded bytes before enqueuing.
const IMAGE_EXT: &str = "png";

pub struct StorageQueueProcessor {
    artifact_queue: Arc<dyn ArtifactQueueRepository>,
    object_store: Arc<dyn ObjectStoreFacade>,
    canonical: Arc<dyn CanonicalContentRepository>,
}

impl StorageQueueProcessor {
    pub fn new(
        artifact_queue: Arc<dyn ArtifactQueueRepository>,
        object_store: Arc<dyn ObjectStoreFacade>,
        canonical: Arc<dyn CanonicalContentRepository>,
    ) -> Self {
        Self {
            artifact_queue,
            object_store,
            canonical,
        }
    }

    async fn persist_one(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        match entry.kind {
            ArtifactKind::Image => self.persist_image(entry).await,
            ArtifactKind::Chunk => self.persist_chunk(entry).await,
            ArtifactKind::Embedding => self.persist_embedding(entry).await,
            ArtifactKind::Link => self.persist_link(entry).await,
            ArtifactKind::Video => self.persist_video(entry).await,
        }
    }

    async fn persist_image(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        if entry.payload.len() < 4 {
            return Err(DocPipeError::invalid_input("image artifact payload missing page-number header"));
        }
        let (header, bytes) = entry.payload.split_at(4);
        let page_number = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let hash = ContentHash::of(bytes);

        if !self.object_store.exists(&hash, IMAGE_EXT).await? {
            self.object_store.put(&hash, IMAGE_EXT, bytes).await?;
        }

        self.canonical
            .upsert_image(&ImageRecord {
                id: entry.id,
                document_id: entry.document_id,
                object_key: format!("{}.{IMAGE_EXT}", hash.as_hex()),
                page_number,
                content_hash: hash,
            })
            .await
    }

    async fn persist_chunk(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        #[derive(Deserialize)]
        struct Draft {
            sequence: u32,
            text: String,
            content_hash: String,
        }
        let draft: Draft = decode_json(&entry.payload)?;
        self.canonical
            .upsert_chunk(&ChunkRecord {
                id: entry.id,
                document_id: entry.document_id,
                sequence: draft.sequence,
                text: draft.text,
                content_hash: ContentHash::from_hex(draft.content_hash),
            })
            .await
    }

    async fn persist_embedding(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        #[derive(Deserialize)]
        struct Draft {
            chunk_id: String,
            model: String,
            vector: Vec<f32>,
        }
        let draft: Draft = decode_json(&entry.payload)?;
        let chunk_id = Uuid::parse_str(&draft.chunk_id).map_err(|e| DocPipeError::invalid_input(format!("malformed chunk_id: {e}")))?;
        self.canonical
            .upsert_embedding(&EmbeddingRecord {
                chunk_id,
                document_id: entry.document_id,
                model: draft.model,
                vector: draft.vector,
            })
            .await
    }

    async fn persist_link(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        #[derive(Deserialize)]
        struct Draft {
            url: String,
            kind: String,
            provider_name: Option<String>,
            provider_external_id: Option<String>,
        }
        let draft: Draft = decode_json(&entry.payload)?;
        let kind = match draft.kind.as_str() {
            "url" => LinkKind::Url,
            "video" => LinkKind::Video,
            other => return Err(DocPipeError::invalid_input(format!("unknown link kind: {other}"))),
        };
        self.canonical
            .upsert_link(&LinkRecord {
                id: entry.id,
                document_id: entry.document_id,
                url: draft.url,
                kind,
                provider_name: draft.provider_name,
                provider_external_id: draft.provider_external_id,
            })
            .await
    }

    async fn persist_video(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
        #[derive(Deserialize)]
        struct Draft {
            link_id: String,
            provider_name: String,
            provider_external_id: String,
            title: Option<String>,
            duration_seconds: Option<u32>,
        }
        let draft: Draft = decode_json(&entry.payload)?;
        let link_id = Uuid::parse_str(&draft.link_id).map_err(|e| DocPipeError::invalid_input(format!("malformed link_id: {e}")))?;
        self.canonical
            .upsert_video(&VideoRecord {
                id: entry.id,
                document_id: entry.document_id,
                link_id,
                provider_name: draft.provider_name,
                provider_external_id: draft.provider_external_id,
                title: draft.title,
                duration_seconds: draft.duration_seconds,
            })
            .await
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T, DocPipeError> {
    serde_json::from_slice(payload).map_err(|e| DocPipeError::invalid_input(format!("malformed artifact payload: {e}")))
}

#[async_trait]
impl StageHandler for StorageQueueProcessor {
    async fn prepare(&self, document: &Document) -> Result<InputHandle, DocPipeError> {
        let entries = self.artifact_queue.peek_pending(document.id, BATCH_LIMIT).await?;
        Ok(InputHandle::new(entries))
    }

    async fn execute(&self, input: InputHandle, progress: &dyn ProgressSink) -> Outcome {
        let entries: Vec<ArtifactQueueEntry> = match input.downcast() {
            Ok(entries) => entries,
            Err(err) => return Outcome::permanent(err),
        };
        let total = entries.len().max(1);

        for (i, entry) in entries.iter().enumerate() {
            if let Err(err) = self.persist_one(entry).await {
                return if err.is_transient() { Outcome::transient(err) } else { Outcome::permanent(err) };
            }
            if let Err(err) = self.artifact_queue.remove(entry.id).await {
                return Outcome::transient(err);
            }
            progress.report(((i + 1) as f64 / total as f64) * 100.0).await;
        }

        let mut metadata = HashMap::new();
        metadata.insert("drained".to_string(), Value::from(entries.len()));
        Outcome::success_with(metadata)
    }

    async fn cleanup_outputs(&self, document: &Document) -> Result<(), DocPipeError> {
        self.canonical.delete_for_document(document.id).await
    }

    async fn input_hash(&self, document: &Document) -> Result<ContentHash, DocPipeError> {
        // Hashes the ids of everything still queued. Once the queue is
        // fully drained this settles to a stable hash (the document's own
        // content hash plus an empty-queue sentinel), so a subsequent
        // `smart` run finds the stored marker still matches and skips
        // re-draining an already-empty queue.
        let pending = self.artifact_queue.peek_pending(document.id, 10_000).await?;
        let mut ids: Vec<String> = pending.iter().map(|e| e.id.to_string()).collect();
        ids.sort_unstable();
        ids.push(document.content_hash.as_hex().to_string());
        Ok(ContentHash::of_parts(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docuflow_domain::entities::DocumentStatus;
    use docuflow_domain::services::stage_handler::NullProgressSink;
    use docuflow_domain::value_objects::DocumentId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryQueue(Mutex<Vec<ArtifactQueueEntry>>);

    #[async_trait]
    impl ArtifactQueueRepository for InMemoryQueue {
        async fn enqueue(&self, entry: &ArtifactQueueEntry) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }
        async fn peek_pending(&self, document_id: DocumentId, limit: usize) -> Result<Vec<ArtifactQueueEntry>, DocPipeError> {
            Ok(self.0.lock().unwrap().iter().filter(|e| e.document_id == document_id).take(limit).cloned().collect())
        }
        async fn remove(&self, id: Uuid) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryObjectStore(Mutex<HashMap<String, Vec<u8>>>);

    #[async_trait]
    impl ObjectStoreFacade for InMemoryObjectStore {
        async fn put(&self, hash: &ContentHash, ext: &str, bytes: &[u8]) -> Result<String, DocPipeError> {
            let key = format!("{}.{ext}", hash.as_hex());
            self.0.lock().unwrap().entry(key.clone()).or_insert_with(|| bytes.to_vec());
            Ok(key)
        }
        async fn exists(&self, hash: &ContentHash, ext: &str) -> Result<bool, DocPipeError> {
            Ok(self.0.lock().unwrap().contains_key(&format!("{}.{ext}", hash.as_hex())))
        }
    }

    #[derive(Default)]
    struct InMemoryCanonical {
        images: Mutex<Vec<ImageRecord>>,
        chunks: Mutex<Vec<ChunkRecord>>,
        embeddings: Mutex<Vec<EmbeddingRecord>>,
        links: Mutex<Vec<LinkRecord>>,
        videos: Mutex<Vec<VideoRecord>>,
    }

    #[async_trait]
    impl CanonicalContentRepository for InMemoryCanonical {
        async fn upsert_image(&self, record: &ImageRecord) -> Result<(), DocPipeError> {
            let mut guard = self.images.lock().unwrap();
            if !guard.iter().any(|r| r.content_hash == record.content_hash) {
                guard.push(record.clone());
            }
            Ok(())
        }
        async fn upsert_chunk(&self, record: &ChunkRecord) -> Result<(), DocPipeError> {
            self.chunks.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<(), DocPipeError> {
            self.embeddings.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn upsert_link(&self, record: &LinkRecord) -> Result<(), DocPipeError> {
            self.links.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn upsert_video(&self, record: &VideoRecord) -> Result<(), DocPipeError> {
            self.videos.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn count_indexed_resources(&self, document_id: DocumentId) -> Result<u64, DocPipeError> {
            let n = self.images.lock().unwrap().iter().filter(|r| r.document_id == document_id).count()
                + self.chunks.lock().unwrap().iter().filter(|r| r.document_id == document_id).count()
                + self.embeddings.lock().unwrap().iter().filter(|r| r.document_id == document_id).count()
                + self.links.lock().unwrap().iter().filter(|r| r.document_id == document_id).count()
                + self.videos.lock().unwrap().iter().filter(|r| r.document_id == document_id).count();
            Ok(n as u64)
        }
        async fn delete_for_document(&self, document_id: DocumentId) -> Result<(), DocPipeError> {
            self.images.lock().unwrap().retain(|r| r.document_id != document_id);
            self.chunks.lock().unwrap().retain(|r| r.document_id != document_id);
            self.embeddings.lock().unwrap().retain(|r| r.document_id != document_id);
            self.links.lock().unwrap().retain(|r| r.document_id != document_id);
            self.videos.lock().unwrap().retain(|r| r.document_id != document_id);
            Ok(())
        }
    }

    fn sample_document() -> Document {
        Document::new("manual.pdf", ContentHash::of(b"bytes"))
    }

    fn chunk_payload(sequence: u32, text: &str) -> Vec<u8> {
        serde_json::json!({
            "sequence": sequence,
            "text": text,
            "content_hash": ContentHash::of(text.as_bytes()).as_hex(),
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn drains_a_mixed_batch_and_removes_every_entry() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::default());
        let canonical = Arc::new(InMemoryCanonical::default());
        let processor = StorageQueueProcessor::new(queue.clone(), store.clone(), canonical.clone());
        let document = sample_document();

        let mut image_payload = 1u32.to_be_bytes().to_vec();
        image_payload.extend_from_slice(b"fake-png-bytes");
        queue.enqueue(&ArtifactQueueEntry::new(document.id, docuflow_domain::value_objects::StageName::ImageProcessing, ArtifactKind::Image, image_payload)).await.unwrap();
        queue.enqueue(&ArtifactQueueEntry::new(document.id, docuflow_domain::value_objects::StageName::Chunking, ArtifactKind::Chunk, chunk_payload(0, "hello world"))).await.unwrap();

        let input = processor.prepare(&document).await.unwrap();
        let outcome = processor.execute(input, &NullProgressSink).await;

        assert!(matches!(outcome, Outcome::Success { .. }));
        assert!(queue.peek_pending(document.id, 10).await.unwrap().is_empty());
        assert_eq!(canonical.count_indexed_resources(document.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_image_hash_is_not_reuploaded() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::default());
        let canonical = Arc::new(InMemoryCanonical::default());
        let processor = StorageQueueProcessor::new(queue.clone(), store.clone(), canonical.clone());
        let document = sample_document();

        for page in [1u32, 2u32] {
            let mut payload = page.to_be_bytes().to_vec();
            payload.extend_from_slice(b"identical-bytes");
            queue
                .enqueue(&ArtifactQueueEntry::new(document.id, docuflow_domain::value_objects::StageName::ImageProcessing, ArtifactKind::Image, payload))
                .await
                .unwrap();
        }

        let input = processor.prepare(&document).await.unwrap();
        processor.execute(input, &NullProgressSink).await;

        assert_eq!(canonical.count_indexed_resources(document.id).await.unwrap(), 1, "dedupe by content hash");
    }

    #[tokio::test]
    async fn input_hash_settles_once_the_queue_is_drained() {
        let queue = Arc::new(InMemoryQueue::default());
        let store = Arc::new(InMemoryObjectStore::default());
        let canonical = Arc::new(InMemoryCanonical::default());
        let processor = StorageQueueProcessor::new(queue, store, canonical);
        let document = sample_document();

        let empty_hash_a = processor.input_hash(&document).await.unwrap();
        let empty_hash_b = processor.input_hash(&document).await.unwrap();
        assert_eq!(empty_hash_a, empty_hash_b);
    }

    #[test]
    fn document_status_default_is_pending() {
        assert_eq!(sample_document().status, DocumentStatus::Pending);
    }
}
