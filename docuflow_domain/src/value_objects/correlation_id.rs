// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Correlation identifiers threading one retry chain across log lines and
//! `pipeline_errors` rows: `{request_id}.stage_{stage}.retry_{attempt}`.

use crate::value_objects::stage_name::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one document-level pipeline invocation. Stable across every
/// stage and retry attempt made while processing that invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one (request, stage, attempt) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(request_id: RequestId, stage: StageName, attempt: u32) -> Self {
        Self(format!("{request_id}.stage_{stage}.retry_{attempt}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a correlation id string read back from storage. Does not
    /// re-validate the `{request_id}.stage_{stage}.retry_{attempt}` shape;
    /// that invariant is only enforced at construction time by [`Self::new`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_stage_and_attempt() {
        let request_id = RequestId::new();
        let id = CorrelationId::new(request_id, StageName::Embedding, 2);
        assert_eq!(
            id.as_str(),
            format!("{request_id}.stage_embedding.retry_2")
        );
    }

    #[test]
    fn distinct_attempts_produce_distinct_ids() {
        let request_id = RequestId::new();
        let a = CorrelationId::new(request_id, StageName::Embedding, 0);
        let b = CorrelationId::new(request_id, StageName::Embedding, 1);
        assert_ne!(a, b);
    }
}
