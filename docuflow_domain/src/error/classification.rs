// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Error Classifier
//!
//! Pure, side-effect-free mapping from a raw failure to `{is_transient,
//! category}`. Every exception the retry orchestrator observes is run
//! through [`classify`]; an exception this module does not recognize
//! classifies as permanent, never transient — retrying unknown failures
//! indefinitely is worse than failing fast.

use serde::{Deserialize, Serialize};

/// Closed vocabulary of error categories. Used as a metrics label and a
/// routing key by the retry orchestrator, so it deliberately does not grow
/// a new variant per external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Document unreadable or malformed; fatal to that document.
    InputInvalid,
    /// Timeouts, connection resets, 5xx/408/429; retryable.
    ExternalTransient,
    /// 4xx other than 408/429, auth failures; not retried.
    ExternalPermanent,
    /// An assertion or invariant inside a stage handler broke.
    HandlerBug,
    /// Advisory-lock acquisition failed; another worker holds it.
    Coordination,
    /// Cooperative cancellation interrupted the operation.
    Cancelled,
}

impl ErrorCategory {
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCategory::ExternalTransient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InputInvalid => "input_invalid",
            ErrorCategory::ExternalTransient => "external_transient",
            ErrorCategory::ExternalPermanent => "external_permanent",
            ErrorCategory::HandlerBug => "handler_bug",
            ErrorCategory::Coordination => "coordination",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

/// The result of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_transient: bool,
    pub category: ErrorCategory,
}

impl Classification {
    fn new(category: ErrorCategory) -> Self {
        Self {
            is_transient: category.is_transient(),
            category,
        }
    }
}

/// Classifies a [`crate::error::DocPipeError`] raised by a stage handler or
/// an infrastructure adapter.
pub fn classify(error: &crate::error::DocPipeError) -> Classification {
    Classification::new(error.category())
}

/// Classifies a raw HTTP-like status code, for adapters that only have a
/// status code to go on (the embedding service facade, video-metadata
/// providers). 408 and 429 are transient despite being 4xx; everything
/// else follows the usual 4xx/5xx split.
pub fn classify_http_status(status: u16) -> Classification {
    let category = match status {
        408 | 429 => ErrorCategory::ExternalTransient,
        500..=599 => ErrorCategory::ExternalTransient,
        400..=499 => ErrorCategory::ExternalPermanent,
        _ => ErrorCategory::ExternalPermanent,
    };
    Classification::new(category)
}
