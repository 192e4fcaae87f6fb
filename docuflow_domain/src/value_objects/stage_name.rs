// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The ten named stages a document passes through, in their canonical order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage identifier. Stable, lowercase, snake_case strings are used at the
/// persistence boundary so schema and log output never depend on enum
/// discriminant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Upload,
    TextExtraction,
    ImageProcessing,
    Classification,
    MetadataExtraction,
    Chunking,
    LinkExtraction,
    Storage,
    Embedding,
    SearchIndexing,
}

impl StageName {
    /// All stages in their fixed pipeline order.
    pub const ORDER: [StageName; 10] = [
        StageName::Upload,
        StageName::TextExtraction,
        StageName::ImageProcessing,
        StageName::Classification,
        StageName::MetadataExtraction,
        StageName::Chunking,
        StageName::LinkExtraction,
        StageName::Storage,
        StageName::Embedding,
        StageName::SearchIndexing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Upload => "upload",
            StageName::TextExtraction => "text_extraction",
            StageName::ImageProcessing => "image_processing",
            StageName::Classification => "classification",
            StageName::MetadataExtraction => "metadata_extraction",
            StageName::Chunking => "chunking",
            StageName::LinkExtraction => "link_extraction",
            StageName::Storage => "storage",
            StageName::Embedding => "embedding",
            StageName::SearchIndexing => "search_indexing",
        }
    }

    /// Ordinal position in the canonical pipeline (0-indexed).
    pub fn ordinal(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }

    /// Whether a permanent failure of this stage is tolerated by the
    /// scheduler (document still reaches `completed`).
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            StageName::ImageProcessing | StageName::LinkExtraction | StageName::MetadataExtraction
        )
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage name: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn order_matches_ordinal() {
        for (i, stage) in StageName::ORDER.iter().enumerate() {
            assert_eq!(stage.ordinal(), i);
        }
    }

    #[test]
    fn round_trips_through_str() {
        for stage in StageName::ORDER {
            assert_eq!(StageName::from_str(stage.as_str()).unwrap(), stage);
        }
    }

    #[test]
    fn optional_stages_are_exactly_the_enrichment_ones() {
        assert!(StageName::ImageProcessing.is_optional());
        assert!(StageName::LinkExtraction.is_optional());
        assert!(StageName::MetadataExtraction.is_optional());
        assert!(!StageName::Upload.is_optional());
        assert!(!StageName::Embedding.is_optional());
        assert!(!StageName::SearchIndexing.is_optional());
    }
}
