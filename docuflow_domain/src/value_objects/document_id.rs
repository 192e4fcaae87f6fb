// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Document Identifier
//!
//! `DocumentId` is a ULID-backed identifier for a document under ingestion.
//! ULIDs are used instead of UUIDv4 so identifiers sort chronologically,
//! which keeps `list_all`/pagination queries naturally ordered by ingestion
//! time without a secondary index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique identifier for a [`crate::entities::document::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Ulid);

impl DocumentId {
    /// Generates a new, time-ordered identifier.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wraps an existing ULID, e.g. one read back from storage.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = DocumentId::new();
        let s = id.to_string();
        let parsed = DocumentId::from_str(&s).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn two_new_ids_are_distinct() {
        assert_ne!(DocumentId::new(), DocumentId::new());
    }

    #[test]
    fn ids_are_monotonically_sortable() {
        let a = DocumentId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = DocumentId::new();
        assert!(a < b);
    }
}
