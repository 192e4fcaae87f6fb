// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! Two layers:
//!
//! - [`BootstrapLogger`]: a minimal trait for messages emitted before
//!   `tracing` itself is installed (argument parsing, config loading) — the
//!   composition root may still be deciding what the configured log level
//!   even is, so these go straight to the console.
//! - [`install`]: installs the real `tracing-subscriber` pipeline the rest
//!   of the process logs through, honoring `config.log_level` and an
//!   optional `RUST_LOG` override via `EnvFilter`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::DocuflowConfig;

/// Bootstrap-phase logging, used only until [`install`] has run.
pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

pub struct ConsoleLogger;

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        eprintln!("[error] {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("[warn] {message}");
    }

    fn info(&self, message: &str) {
        println!("[info] {message}");
    }

    fn debug(&self, message: &str) {
        println!("[debug] {message}");
    }
}

#[derive(Default)]
pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Installs the process-wide `tracing` subscriber. Must be called exactly
/// once, after configuration has been loaded and before any stage runs.
pub fn install(config: &DocuflowConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt().with_env_filter(filter).with_target(true).with_level(true).init();
}
