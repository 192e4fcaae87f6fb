// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Content-addressed blob storage: `PUT` under `{hash}.{ext}` with
//! read-after-write consistency; a key that already exists is left alone
//! rather than re-uploaded.

use async_trait::async_trait;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::value_objects::ContentHash;

#[async_trait]
pub trait ObjectStoreFacade: Send + Sync {
    /// Uploads `bytes` under `{hash}.{ext}`. A no-op if the key already
    /// exists — callers rely on this for dedupe-by-hash.
    async fn put(&self, hash: &ContentHash, ext: &str, bytes: &[u8]) -> Result<String, DocPipeError>;

    async fn exists(&self, hash: &ContentHash, ext: &str) -> Result<bool, DocPipeError>;
}
