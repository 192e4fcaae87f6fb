// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Object Store
//!
//! A content-addressed [`ObjectStoreFacade`] backed by a local directory:
//! `PUT` under `{hash}.{ext}` with read-after-write consistency. A
//! key that already exists is left untouched — the write is a fresh-file
//! create, never an overwrite, so a second `put` for the same hash is a
//! guaranteed no-op rather than a racy read-then-write.
//!
//! Production deployments that need a real object store (S3, GCS, ...)
//! implement [`ObjectStoreFacade`] against that provider's SDK instead;
//! this adapter exists for the reference/standalone deployment the
//! composition root wires by default.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::ErrorKind;

use docuflow_domain::error::DocPipeError;
use docuflow_domain::value_objects::ContentHash;

use crate::application::facades::ObjectStoreFacade;

pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, hash: &ContentHash, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{ext}", hash.as_hex()))
    }
}

#[async_trait]
impl ObjectStoreFacade for FilesystemObjectStore {
    async fn put(&self, hash: &ContentHash, ext: &str, bytes: &[u8]) -> Result<String, DocPipeError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DocPipeError::external_transient(format!("failed to create object store root: {e}")))?;

        let path = self.key_path(hash, ext);
        let key = format!("{}.{ext}", hash.as_hex());

        match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(bytes)
                    .await
                    .map_err(|e| DocPipeError::external_transient(format!("failed to write object {key}: {e}")))?;
                file.flush().await.map_err(|e| DocPipeError::external_transient(format!("failed to flush object {key}: {e}")))?;
                Ok(key)
            }
            // The key already exists: dedupe-by-hash means this upload is a
            // no-op, not an error.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(key),
            Err(err) => Err(DocPipeError::external_transient(format!("failed to create object {key}: {err}"))),
        }
    }

    async fn exists(&self, hash: &ContentHash, ext: &str) -> Result<bool, DocPipeError> {
        Ok(tokio::fs::try_exists(self.key_path(hash, ext))
            .await
            .map_err(|e| DocPipeError::external_transient(format!("failed to check object existence: {e}")))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_exists_round_trips() {
        let dir = tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        let hash = ContentHash::of(b"page one");

        let key = store.put(&hash, "png", b"fake png bytes").await.unwrap();
        assert_eq!(key, format!("{}.png", hash.as_hex()));
        assert!(store.exists(&hash, "png").await.unwrap());
    }

    #[tokio::test]
    async fn re_uploading_an_existing_key_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        let hash = ContentHash::of(b"page one");

        store.put(&hash, "png", b"first write").await.unwrap();
        // A second put with different bytes must not clobber the first.
        store.put(&hash, "png", b"different bytes, should be ignored").await.unwrap();

        let path = dir.path().join(format!("{}.png", hash.as_hex()));
        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"first write");
    }

    #[tokio::test]
    async fn missing_key_reports_not_existing() {
        let dir = tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        let hash = ContentHash::of(b"never uploaded");

        assert!(!store.exists(&hash, "png").await.unwrap());
    }
}
