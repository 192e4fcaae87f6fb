// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! One error enum for the whole domain, grouped the way `pipeline_errors`
//! rows and metrics want to group them: by what went wrong, not by which
//! module noticed it.
//!
//! ## Error Categories
//!
//! - **InvalidInput**: the document or a stage's input is malformed.
//! - **ExternalTransient**: a collaborator (store, object store, embedding
//!   service) failed in a way retrying might fix.
//! - **ExternalPermanent**: a collaborator rejected the request outright.
//! - **HandlerBug**: an assertion or invariant inside a stage handler broke.
//! - **Coordination**: advisory-lock contention; not really a failure.
//! - **Cancelled**: cooperative shutdown interrupted the operation.
//! - **Configuration** / **Validation** / **Database** / **Serialization** /
//!   **Internal**: ambient infrastructure failures that do not fit the
//!   pipeline-specific categories above.

pub mod classification;

pub use classification::{classify, ErrorCategory};

use thiserror::Error;

/// Domain-specific errors for the document processing pipeline.
#[derive(Error, Debug, Clone)]
pub enum DocPipeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("external service error (transient): {0}")]
    ExternalTransient(String),

    #[error("external service error (permanent): {0}")]
    ExternalPermanent(String),

    #[error("stage handler bug: {0}")]
    HandlerBug(String),

    #[error("lock contention: {0}")]
    Coordination(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DocPipeError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn external_transient(msg: impl Into<String>) -> Self {
        Self::ExternalTransient(msg.into())
    }

    pub fn external_permanent(msg: impl Into<String>) -> Self {
        Self::ExternalPermanent(msg.into())
    }

    pub fn handler_bug(msg: impl Into<String>) -> Self {
        Self::HandlerBug(msg.into())
    }

    pub fn coordination(msg: impl Into<String>) -> Self {
        Self::Coordination(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Closed-vocabulary category tag, used for metrics and for routing
    /// through the retry orchestrator.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DocPipeError::InvalidInput(_) => ErrorCategory::InputInvalid,
            DocPipeError::ExternalTransient(_) => ErrorCategory::ExternalTransient,
            DocPipeError::ExternalPermanent(_) => ErrorCategory::ExternalPermanent,
            DocPipeError::HandlerBug(_) => ErrorCategory::HandlerBug,
            DocPipeError::Coordination(_) => ErrorCategory::Coordination,
            DocPipeError::Cancelled(_) => ErrorCategory::Cancelled,
            // Ambient infrastructure failures classify as permanent: retrying
            // a malformed config or a serialization bug never helps.
            DocPipeError::Configuration(_)
            | DocPipeError::Validation(_)
            | DocPipeError::Database(_)
            | DocPipeError::Serialization(_)
            | DocPipeError::Internal(_) => ErrorCategory::ExternalPermanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }
}

impl From<std::io::Error> for DocPipeError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => {
                DocPipeError::ExternalTransient(err.to_string())
            }
            _ => DocPipeError::ExternalPermanent(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DocPipeError {
    fn from(err: serde_json::Error) -> Self {
        DocPipeError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping_is_stable() {
        assert_eq!(DocPipeError::invalid_input("x").category(), ErrorCategory::InputInvalid);
        assert_eq!(DocPipeError::external_transient("x").category(), ErrorCategory::ExternalTransient);
        assert_eq!(DocPipeError::handler_bug("x").category(), ErrorCategory::HandlerBug);
    }

    #[test]
    fn ambient_errors_are_never_retried() {
        assert!(!DocPipeError::configuration("x").is_transient());
        assert!(!DocPipeError::database("x").is_transient());
    }

    #[test]
    fn io_timeout_is_transient_other_io_errors_are_not() {
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(DocPipeError::from(timeout).is_transient());

        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!DocPipeError::from(not_found).is_transient());
    }
}
