// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Document Aggregate
//!
//! Aggregates a [`Document`] with the [`StageStatus`] of every stage
//! considered for it so far, and owns the one invariant that spans both:
//! prerequisite gating. Nothing outside this module should decide whether
//! a stage is runnable.

use crate::entities::{Document, StageExecutionStatus, StageStatus};
use crate::value_objects::StageName;
use std::collections::HashMap;

/// Static prerequisite table. `text_extraction` gates everything; the four
/// enrichment stages may run in any order after it; `storage` needs all of
/// them; `embedding` needs `chunking` and `storage`; `search_indexing`
/// needs `embedding`.
pub fn prerequisites_of(stage: StageName) -> &'static [StageName] {
    use StageName::*;
    match stage {
        Upload => &[],
        TextExtraction => &[Upload],
        ImageProcessing => &[TextExtraction],
        Classification => &[TextExtraction],
        MetadataExtraction => &[TextExtraction],
        Chunking => &[TextExtraction],
        LinkExtraction => &[TextExtraction],
        Storage => &[ImageProcessing, Classification, MetadataExtraction, Chunking, LinkExtraction],
        Embedding => &[Chunking, Storage],
        SearchIndexing => &[Embedding],
    }
}

/// A document together with the stage statuses recorded for it so far.
pub struct DocumentAggregate {
    pub document: Document,
    stage_statuses: HashMap<StageName, StageStatus>,
}

impl DocumentAggregate {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            stage_statuses: HashMap::new(),
        }
    }

    pub fn load(document: Document, stage_statuses: Vec<StageStatus>) -> Self {
        Self {
            document,
            stage_statuses: stage_statuses.into_iter().map(|s| (s.stage, s)).collect(),
        }
    }

    pub fn stage_status(&self, stage: StageName) -> Option<&StageStatus> {
        self.stage_statuses.get(&stage)
    }

    pub fn record_status(&mut self, status: StageStatus) {
        self.stage_statuses.insert(status.stage, status);
    }

    /// A required prerequisite is satisfied by completion or skip; an
    /// optional prerequisite that permanently failed also satisfies the
    /// gate, since the scheduler continues past optional failures.
    fn prerequisite_satisfied(&self, prerequisite: StageName) -> bool {
        match self.stage_statuses.get(&prerequisite) {
            Some(status) if status.is_complete() => true,
            Some(status) if status.status == StageExecutionStatus::Failed && prerequisite.is_optional() => true,
            _ => false,
        }
    }

    /// Whether every prerequisite of `stage` is satisfied for this
    /// document. Required-stage gating and `run_subset` misuse detection
    /// both go through this one method.
    pub fn prerequisites_met(&self, stage: StageName) -> bool {
        prerequisites_of(stage).iter().all(|p| self.prerequisite_satisfied(*p))
    }

    /// Stages whose prerequisites are all satisfied and which have not yet
    /// reached a terminal state, in canonical order.
    pub fn runnable_stages(&self) -> Vec<StageName> {
        StageName::ORDER
            .into_iter()
            .filter(|&stage| self.prerequisites_met(stage))
            .filter(|&stage| !self.stage_statuses.get(&stage).map(StageStatus::is_complete).unwrap_or(false))
            .collect()
    }

    /// `true` once every stage has reached a terminal (complete or
    /// permanently failed-and-optional) state.
    pub fn all_required_stages_settled(&self) -> bool {
        StageName::ORDER.iter().all(|&stage| {
            self.stage_statuses
                .get(&stage)
                .map(|s| s.is_complete() || (s.status == StageExecutionStatus::Failed && stage.is_optional()))
                .unwrap_or(false)
        })
    }

    pub fn has_required_failure(&self) -> bool {
        self.stage_statuses
            .values()
            .any(|s| s.status == StageExecutionStatus::Failed && !s.stage.is_optional())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ContentHash;

    fn fresh_aggregate() -> DocumentAggregate {
        DocumentAggregate::new(Document::new("manual.pdf", ContentHash::of(b"bytes")))
    }

    #[test]
    fn upload_has_no_prerequisites() {
        let agg = fresh_aggregate();
        assert!(agg.prerequisites_met(StageName::Upload));
    }

    #[test]
    fn text_extraction_requires_upload_complete() {
        let mut agg = fresh_aggregate();
        assert!(!agg.prerequisites_met(StageName::TextExtraction));

        let mut upload = StageStatus::new(agg.document.id, StageName::Upload);
        upload.complete(Default::default());
        agg.record_status(upload);

        assert!(agg.prerequisites_met(StageName::TextExtraction));
    }

    #[test]
    fn storage_requires_all_four_enrichment_stages() {
        let mut agg = fresh_aggregate();
        for stage in [StageName::Upload, StageName::TextExtraction] {
            let mut s = StageStatus::new(agg.document.id, stage);
            s.complete(Default::default());
            agg.record_status(s);
        }
        assert!(!agg.prerequisites_met(StageName::Storage));

        for stage in [
            StageName::ImageProcessing,
            StageName::Classification,
            StageName::MetadataExtraction,
            StageName::Chunking,
            StageName::LinkExtraction,
        ] {
            let mut s = StageStatus::new(agg.document.id, stage);
            s.complete(Default::default());
            agg.record_status(s);
        }
        assert!(agg.prerequisites_met(StageName::Storage));
    }

    #[test]
    fn an_optional_stage_permanent_failure_still_satisfies_the_gate() {
        let mut agg = fresh_aggregate();
        for stage in [StageName::Upload, StageName::TextExtraction] {
            let mut s = StageStatus::new(agg.document.id, stage);
            s.complete(Default::default());
            agg.record_status(s);
        }
        for stage in [StageName::ImageProcessing, StageName::Classification, StageName::Chunking, StageName::LinkExtraction]
        {
            let mut s = StageStatus::new(agg.document.id, stage);
            s.complete(Default::default());
            agg.record_status(s);
        }
        let mut metadata = StageStatus::new(agg.document.id, StageName::MetadataExtraction);
        metadata.fail("permanent provider error");
        agg.record_status(metadata);

        assert!(agg.prerequisites_met(StageName::Storage));
        assert!(agg.has_required_failure() == false);
    }

    #[test]
    fn a_required_stage_failure_is_detected() {
        let mut agg = fresh_aggregate();
        let mut upload = StageStatus::new(agg.document.id, StageName::Upload);
        upload.fail("corrupt file");
        agg.record_status(upload);
        assert!(agg.has_required_failure());
    }
}
