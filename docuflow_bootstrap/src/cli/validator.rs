// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Command-Line Argument Validation
//!
//! Security-first validation applied to every parsed argument before it
//! reaches the composition root: path canonicalization, numeric range
//! checks, and rejection of shell-metacharacter-bearing strings.
//!
//! ## Dangerous patterns detected
//!
//! `..` (traversal), `~` (home expansion), `$` (variable expansion),
//! backticks and `;` `&` `|` `>` `<` (shell metacharacters), plus null
//! bytes and newlines.

use std::path::{Path, PathBuf};

use thiserror::Error;

const MAX_ARG_COUNT: usize = 100;
const MAX_ARG_LENGTH: usize = 1000;
const MAX_PATH_LENGTH: usize = 4096;

const DANGEROUS_PATTERNS: &[&str] = &["..", "~", "$", "`", ";", "&", "|", ">", "<", "\n", "\r", "\0"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("too many arguments (max {MAX_ARG_COUNT})")]
    TooManyArguments,
    #[error("argument too long (max {MAX_ARG_LENGTH} characters): {0}")]
    ArgumentTooLong(String),
    #[error("dangerous pattern detected in argument: {pattern} in {arg}")]
    DangerousPattern { pattern: String, arg: String },
    #[error("path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,
    #[error("access to protected system directory denied: {0}")]
    ProtectedDirectory(String),
    #[error("path does not exist: {0}")]
    PathNotFound(String),
    #[error("no input provided")]
    NoInput,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("missing required argument: {0}")]
    MissingArgument(String),
    #[error("invalid argument value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

const PROTECTED_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev"];

/// Security-first argument parser. Every method is a pure validation step;
/// none of them parse CLI structure (that is [`super::parser`]'s job).
pub struct SecureArgParser;

impl SecureArgParser {
    pub fn validate_arg_count(count: usize) -> Result<(), ParseError> {
        if count > MAX_ARG_COUNT {
            return Err(ParseError::TooManyArguments);
        }
        Ok(())
    }

    /// Validates a single argument for length and dangerous shell patterns.
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.chars().take(50).collect::<String>() + "..."));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern {
                    pattern: pattern.to_string(),
                    arg: arg.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validates and canonicalizes a path that must already exist (input
    /// files, config files).
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path).map_err(|e| match e {
            ParseError::ArgumentTooLong(_) => ParseError::InvalidPath(format!("path too long: {path}")),
            ParseError::DangerousPattern { pattern, .. } => {
                ParseError::InvalidPath(format!("path contains dangerous pattern '{pattern}': {path}"))
            }
            other => other,
        })?;

        let path_obj = Path::new(path);
        let canonical = path_obj.canonicalize().map_err(|e| {
            if !path_obj.exists() {
                ParseError::PathNotFound(path.to_string())
            } else {
                ParseError::InvalidPath(format!("{path}: {e}"))
            }
        })?;

        if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if canonical.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(canonical.display().to_string()));
            }
        }

        Ok(canonical)
    }

    /// Validates a path that is allowed not to exist yet (output
    /// directories, a database file about to be created).
    pub fn validate_output_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path)?;
        Ok(PathBuf::from(path))
    }

    pub fn validate_optional_path(path: Option<&str>) -> Result<Option<PathBuf>, ParseError> {
        path.map(Self::validate_path).transpose()
    }

    pub fn validate_number<T>(arg_name: &str, value: &str, min: Option<T>, max: Option<T>) -> Result<T, ParseError>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
    {
        Self::validate_argument(value)?;

        let num = value.parse::<T>().map_err(|_| ParseError::InvalidValue {
            arg: arg_name.to_string(),
            reason: format!("not a valid number: {value}"),
        })?;

        if let Some(min_val) = min {
            if num < min_val {
                return Err(ParseError::InvalidValue {
                    arg: arg_name.to_string(),
                    reason: format!("value {value} is less than minimum {min_val}"),
                });
            }
        }
        if let Some(max_val) = max {
            if num > max_val {
                return Err(ParseError::InvalidValue {
                    arg: arg_name.to_string(),
                    reason: format!("value {value} is greater than maximum {max_val}"),
                });
            }
        }

        Ok(num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_arguments() {
        assert!(SecureArgParser::validate_argument("safe-arg").is_ok());
        assert!(SecureArgParser::validate_argument("manual.pdf").is_ok());
        assert!(SecureArgParser::validate_argument("sub/dir/file").is_ok());
    }

    #[test]
    fn rejects_too_long_arguments() {
        let long_arg = "a".repeat(MAX_ARG_LENGTH + 1);
        assert!(matches!(SecureArgParser::validate_argument(&long_arg), Err(ParseError::ArgumentTooLong(_))));
    }

    #[test]
    fn detects_dangerous_patterns() {
        let dangerous = [
            "../etc/passwd",
            "~/.ssh/id_rsa",
            "$(whoami)",
            "`ls`",
            "file;rm -rf /",
            "file&background",
            "file|pipe",
            "file>output",
            "file<input",
            "file\nwith\nnewlines",
        ];
        for arg in dangerous {
            assert!(
                matches!(SecureArgParser::validate_argument(arg), Err(ParseError::DangerousPattern { .. })),
                "failed to detect dangerous pattern in: {arg}"
            );
        }
    }

    #[test]
    fn rejects_nonexistent_paths() {
        let result = SecureArgParser::validate_path("/this/path/does/not/exist/anywhere");
        assert!(matches!(result, Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn rejects_protected_system_directories() {
        let result = SecureArgParser::validate_path("/etc");
        assert!(matches!(result, Err(ParseError::ProtectedDirectory(_))));
    }

    #[test]
    fn validates_numbers_within_range() {
        let result = SecureArgParser::validate_number::<usize>("max-documents", "4", Some(1), Some(128));
        assert_eq!(result.unwrap(), 4);

        let result = SecureArgParser::validate_number::<usize>("max-documents", "0", Some(1), Some(128));
        assert!(matches!(result, Err(ParseError::InvalidValue { .. })));
    }
}
