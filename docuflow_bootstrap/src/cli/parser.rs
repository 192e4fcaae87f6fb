// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Structure
//!
//! The raw `clap`-derived CLI surface: `process` (one document),
//! `batch` (a directory or an explicit list of document ids), `resume` (a
//! partially-processed document, honoring smart-resume), and
//! `validate-config` (check a configuration file without running anything).
//!
//! This module only describes *structure*; [`super::validator`] checks that
//! the values clap extracted are safe to act on.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "docuflow", version, about = "Document-processing pipeline engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file. Defaults are used for any key it
    /// omits, and environment variables still override both.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit debug-level logs regardless of the configured log level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a single document through the pipeline.
    Process {
        /// Path to the source file to ingest.
        input: String,

        /// Re-run stages even if a completion marker says they already
        /// succeeded.
        #[arg(long)]
        force_reprocess: bool,

        #[arg(long, value_enum, default_value_t = RunModeArg::Full)]
        mode: RunModeArg,
    },

    /// Run every document in a directory, honoring the configured
    /// concurrency limit.
    Batch {
        /// Directory containing source files to ingest.
        input_dir: String,

        #[arg(long)]
        max_documents: Option<usize>,

        #[arg(long)]
        force_reprocess: bool,

        #[arg(long, value_enum, default_value_t = RunModeArg::Full)]
        mode: RunModeArg,
    },

    /// Resume a previously started document, running only the stages that
    /// have not already completed.
    Resume {
        /// The document's id, as printed by a prior `process`/`batch` run.
        document_id: String,

        #[arg(long)]
        force_reprocess: bool,
    },

    /// Parse and validate a configuration file, reporting any problems,
    /// without running the pipeline.
    ValidateConfig {
        /// Path to the TOML configuration file to check.
        path: String,
    },
}

/// Mirrors `docuflow::application::RunMode`, but as a `clap`-friendly enum;
/// the CLI layer never depends on the application crate's own type directly
/// so that this crate's `Commands` stays serializable/parseable in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunModeArg {
    /// Run every registered stage, in dependency order.
    Full,
    /// Run only the stages necessary to reach `search_ready`.
    Minimal,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_command_parses_positional_input() {
        let cli = Cli::parse_from(["docuflow", "process", "manual.pdf"]);
        match cli.command {
            Commands::Process { input, force_reprocess, mode } => {
                assert_eq!(input, "manual.pdf");
                assert!(!force_reprocess);
                assert_eq!(mode, RunModeArg::Full);
            }
            other => panic!("expected Process, got {other:?}"),
        }
    }

    #[test]
    fn batch_command_accepts_max_documents_override() {
        let cli = Cli::parse_from(["docuflow", "batch", "./incoming", "--max-documents", "8"]);
        match cli.command {
            Commands::Batch { input_dir, max_documents, .. } => {
                assert_eq!(input_dir, "./incoming");
                assert_eq!(max_documents, Some(8));
            }
            other => panic!("expected Batch, got {other:?}"),
        }
    }

    #[test]
    fn resume_command_requires_document_id() {
        let cli = Cli::parse_from(["docuflow", "resume", "01J8Z9K8E5Q2J1C4A6R8P0N3V7"]);
        match cli.command {
            Commands::Resume { document_id, force_reprocess } => {
                assert_eq!(document_id, "01J8Z9K8E5Q2J1C4A6R8P0N3V7");
                assert!(!force_reprocess);
            }
            other => panic!("expected Resume, got {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_applies_to_any_subcommand() {
        let cli = Cli::parse_from(["docuflow", "--config", "docuflow.toml", "validate-config", "other.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("docuflow.toml")));
    }
}
