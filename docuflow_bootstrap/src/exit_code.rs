// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions, and
//! the mapping from this binary's terminal `Result` to one of them.

use std::fmt;

use docuflow_domain::error::DocPipeError;

use crate::cli::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    Error = 1,
    /// Invalid arguments, unknown flags, missing required arguments.
    UsageError = 64,
    /// Malformed input data or configuration.
    DataError = 65,
    /// Input file not found or unreadable.
    NoInput = 66,
    /// Required external service unreachable (database, object store).
    Unavailable = 69,
    /// Internal invariant broken inside a stage handler.
    Software = 70,
    /// I/O error reading or writing.
    IoError = 74,
    /// Insufficient privileges.
    NoPerm = 77,
    /// Configuration validation failed.
    Config = 78,
    /// SIGINT.
    Interrupted = 130,
    /// SIGTERM.
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a [`DocPipeError`] category to the exit code that best describes
    /// it.
    pub fn from_pipeline_error(error: &DocPipeError) -> Self {
        use docuflow_domain::error::ErrorCategory;
        match error.category() {
            ErrorCategory::InputInvalid => ExitCode::DataError,
            ErrorCategory::ExternalTransient => ExitCode::Unavailable,
            ErrorCategory::ExternalPermanent => ExitCode::Unavailable,
            ErrorCategory::HandlerBug => ExitCode::Software,
            ErrorCategory::Coordination => ExitCode::Unavailable,
            ErrorCategory::Cancelled => ExitCode::Interrupted,
        }
    }

    pub fn from_parse_error(error: &ParseError) -> Self {
        match error {
            ParseError::PathNotFound(_) | ParseError::NoInput => ExitCode::NoInput,
            ParseError::ProtectedDirectory(_) => ExitCode::NoPerm,
            ParseError::InvalidValue { .. }
            | ParseError::ArgumentTooLong(_)
            | ParseError::DangerousPattern { .. }
            | ParseError::TooManyArguments
            | ParseError::PathTooLong
            | ParseError::InvalidPath(_)
            | ParseError::MissingArgument(_) => ExitCode::UsageError,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::IoError => "I/O error",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert!(ExitCode::Success.is_success());
    }

    #[test]
    fn handler_bug_maps_to_software_error() {
        let error = DocPipeError::handler_bug("invariant broken");
        assert_eq!(ExitCode::from_pipeline_error(&error), ExitCode::Software);
    }

    #[test]
    fn usage_errors_map_to_sysexits_usage_code() {
        let error = ParseError::TooManyArguments;
        assert_eq!(ExitCode::from_parse_error(&error).as_i32(), 64);
    }
}
