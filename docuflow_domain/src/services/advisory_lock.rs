// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Advisory Lock Manager
//!
//! Non-blocking mutual exclusion over a `(document_id, stage_name)` pair,
//! used to keep two scheduler instances (or two retries of the same
//! document racing each other after a crash) from running the same stage
//! concurrently. This is advisory only: nothing prevents a handler from
//! touching storage without holding the lock, the way Postgres
//! `pg_advisory_lock` is advisory. SQLite has no native equivalent, so the
//! infrastructure implementation emulates one with a dedicated table and a
//! non-blocking `INSERT OR IGNORE`.

use crate::error::DocPipeError;
use crate::value_objects::{DocumentId, StageName};
use async_trait::async_trait;
use uuid::Uuid;

/// Proof of ownership returned by a successful [`AdvisoryLockManager::try_acquire`].
/// Only the holder of a matching token may release the lock, which keeps a
/// stale worker from releasing a lock it no longer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockToken(pub Uuid);

impl LockToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait AdvisoryLockManager: Send + Sync {
    /// Attempts to acquire the lock for `(document_id, stage_name)`
    /// immediately. Returns `Ok(None)` on contention rather than blocking —
    /// callers treat contention as [`crate::error::ErrorCategory::Coordination`],
    /// not as a failure worth retrying with backoff.
    async fn try_acquire(
        &self,
        document_id: DocumentId,
        stage_name: StageName,
    ) -> Result<Option<LockToken>, DocPipeError>;

    /// Releases a lock previously acquired with `token`. A mismatched token
    /// (the lock was reassigned after an expiry) is not an error; it means
    /// this caller's ownership already lapsed.
    async fn release(
        &self,
        document_id: DocumentId,
        stage_name: StageName,
        token: LockToken,
    ) -> Result<(), DocPipeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_tokens_are_distinct() {
        assert_ne!(LockToken::new(), LockToken::new());
    }
}
