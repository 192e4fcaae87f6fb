// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # CLI: Parse, Then Validate
//!
//! [`parser`] turns `argv` into a [`parser::Cli`] with `clap`. This module
//! then runs every string-valued field through [`validator::SecureArgParser`]
//! and produces a [`ValidatedCommand`] the composition root can act on
//! without re-checking anything.

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands, RunModeArg};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

use docuflow::application::config::RunMode;
use docuflow_domain::value_objects::DocumentId;

/// A fully validated command, ready for the composition root to dispatch on.
/// Every path has been canonicalized and every numeric argument range-checked;
/// nothing downstream needs to re-validate user input.
#[derive(Debug)]
pub enum ValidatedCommand {
    Process {
        input: PathBuf,
        force_reprocess: bool,
        mode: RunMode,
    },
    Batch {
        input_dir: PathBuf,
        max_documents: Option<usize>,
        force_reprocess: bool,
        mode: RunMode,
    },
    Resume {
        document_id: DocumentId,
        force_reprocess: bool,
    },
    ValidateConfig {
        path: PathBuf,
    },
}

#[derive(Debug)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
}

fn to_run_mode(mode: RunModeArg) -> RunMode {
    match mode {
        RunModeArg::Full => RunMode::RunAll,
        RunModeArg::Minimal => RunMode::Smart,
    }
}

/// Parses `argv` with `clap` and validates every extracted argument,
/// returning a [`ValidatedCli`] or the first [`ParseError`] encountered.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parser::parse_cli();
    validate_cli(cli)
}

pub fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config_path = SecureArgParser::validate_optional_path(cli.config.as_deref().and_then(|p| p.to_str()))?;

    let command = match cli.command {
        Commands::Process { input, force_reprocess, mode } => {
            let input = SecureArgParser::validate_path(&input)?;
            ValidatedCommand::Process { input, force_reprocess, mode: to_run_mode(mode) }
        }
        Commands::Batch { input_dir, max_documents, force_reprocess, mode } => {
            let input_dir = SecureArgParser::validate_path(&input_dir)?;
            if let Some(n) = max_documents {
                SecureArgParser::validate_number("max-documents", &n.to_string(), Some(1usize), Some(1024usize))?;
            }
            ValidatedCommand::Batch { input_dir, max_documents, force_reprocess, mode: to_run_mode(mode) }
        }
        Commands::Resume { document_id, force_reprocess } => {
            SecureArgParser::validate_argument(&document_id)?;
            let document_id = document_id.parse::<DocumentId>().map_err(|_| ParseError::InvalidValue {
                arg: "document-id".to_string(),
                reason: format!("not a valid document id: {document_id}"),
            })?;
            ValidatedCommand::Resume { document_id, force_reprocess }
        }
        Commands::ValidateConfig { path } => {
            let path = SecureArgParser::validate_path(&path)?;
            ValidatedCommand::ValidateConfig { path }
        }
    };

    Ok(ValidatedCli { command, config_path, verbose: cli.verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_process_input_with_traversal() {
        let cli = Cli::parse_from(["docuflow", "process", "../../etc/passwd"]);
        let result = validate_cli(cli);
        assert!(matches!(result, Err(ParseError::InvalidPath(_))));
    }

    #[test]
    fn rejects_resume_with_malformed_document_id() {
        let cli = Cli::parse_from(["docuflow", "resume", "not-a-ulid"]);
        let result = validate_cli(cli);
        assert!(matches!(result, Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_batch_max_documents_out_of_range() {
        let cli = Cli::parse_from(["docuflow", "batch", ".", "--max-documents", "0"]);
        let result = validate_cli(cli);
        assert!(matches!(result, Err(ParseError::InvalidValue { .. })));
    }
}
