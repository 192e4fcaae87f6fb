// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Binary entry point: parse and validate the CLI, load layered
//! configuration, install logging and signal handling, build the
//! composition root, and dispatch on the requested command.

use std::path::Path;

use docuflow::application::cancellation::CancellationToken;
use docuflow::application::config::RunMode;
use docuflow_bootstrap::cli::{self, ValidatedCommand};
use docuflow_bootstrap::exit_code::ExitCode;
use docuflow_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use docuflow_bootstrap::{composition_root, config, signals};
use docuflow_domain::entities::Document;
use docuflow_domain::value_objects::ContentHash;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let bootstrap_logger = ConsoleLogger;

    let validated = match cli::parse_and_validate() {
        Ok(validated) => validated,
        Err(err) => {
            bootstrap_logger.error(&format!("argument validation failed: {err}"));
            return ExitCode::from_parse_error(&err).into();
        }
    };

    let app_config = match config::load(validated.config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            bootstrap_logger.error(&format!("configuration error: {err}"));
            return ExitCode::Config.into();
        }
    };

    docuflow_bootstrap::logger::install(&app_config, validated.verbose);

    if let ValidatedCommand::ValidateConfig { path } = &validated.command {
        return run_validate_config(path).into();
    }

    let root = match composition_root::build(&app_config).await {
        Ok(root) => root,
        Err(err) => {
            tracing::error!(error = %err, "failed to build composition root");
            return ExitCode::Unavailable.into();
        }
    };

    let cancellation = CancellationToken::new();
    let _signal_listener = signals::spawn_signal_listener(cancellation.clone());

    let outcome = match validated.command {
        ValidatedCommand::Process { input, force_reprocess, mode } => {
            run_process(&root, &input, force_reprocess, mode, cancellation).await
        }
        ValidatedCommand::Batch { input_dir, max_documents, force_reprocess, mode } => {
            run_batch(&root, &input_dir, max_documents, force_reprocess, mode, cancellation).await
        }
        ValidatedCommand::Resume { document_id, force_reprocess } => {
            run_resume(&root, document_id, force_reprocess, cancellation).await
        }
        ValidatedCommand::ValidateConfig { .. } => unreachable!("handled above before the composition root was built"),
    };

    match outcome {
        Ok(code) => code.into(),
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::from_pipeline_error(&err).into()
        }
    }
}

async fn run_process(
    root: &composition_root::CompositionRoot,
    input: &Path,
    force_reprocess: bool,
    mode: RunMode,
    cancellation: CancellationToken,
) -> Result<ExitCode, docuflow_domain::error::DocPipeError> {
    let document = load_or_create_document(root, input).await?;

    let result = root.scheduler.run(document, &mode, force_reprocess, cancellation).await?;
    tracing::info!(document_id = %result.document_id, status = ?result.document_status, "process finished");

    Ok(match result.document_status {
        docuflow_domain::entities::DocumentStatus::Completed => ExitCode::Success,
        docuflow_domain::entities::DocumentStatus::Failed => ExitCode::Software,
        _ => ExitCode::Success,
    })
}

async fn run_batch(
    root: &composition_root::CompositionRoot,
    input_dir: &Path,
    max_documents: Option<usize>,
    force_reprocess: bool,
    mode: RunMode,
    cancellation: CancellationToken,
) -> Result<ExitCode, docuflow_domain::error::DocPipeError> {
    let _ = max_documents; // concurrency is fixed at composition-root build time, from config

    let mut documents = Vec::new();
    let mut entries = tokio::fs::read_dir(input_dir)
        .await
        .map_err(|err| docuflow_domain::error::DocPipeError::invalid_input(format!("cannot read {}: {err}", input_dir.display())))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| docuflow_domain::error::DocPipeError::invalid_input(format!("error listing {}: {err}", input_dir.display())))?
    {
        let path = entry.path();
        if path.is_file() {
            documents.push(load_or_create_document(root, &path).await?);
        }
    }

    let (stats, outcomes) = root.batch_controller.run_batch(documents, mode, force_reprocess, cancellation).await;
    tracing::info!(
        total = stats.total,
        completed = stats.by_status.get(&docuflow_domain::entities::DocumentStatus::Completed).copied().unwrap_or(0),
        failed = stats.by_status.get(&docuflow_domain::entities::DocumentStatus::Failed).copied().unwrap_or(0),
        duration_seconds = stats.duration_seconds,
        "batch finished"
    );

    let any_failed = outcomes.iter().any(|o| o.status == docuflow_domain::entities::DocumentStatus::Failed);
    Ok(if any_failed { ExitCode::Software } else { ExitCode::Success })
}

async fn run_resume(
    root: &composition_root::CompositionRoot,
    document_id: docuflow_domain::value_objects::DocumentId,
    force_reprocess: bool,
    cancellation: CancellationToken,
) -> Result<ExitCode, docuflow_domain::error::DocPipeError> {
    use docuflow_domain::repositories::DocumentRepository;

    let document = root
        .document_repo
        .find_by_id(document_id)
        .await?
        .ok_or_else(|| docuflow_domain::error::DocPipeError::invalid_input(format!("no document with id {document_id}")))?;

    let result = root
        .scheduler
        .run(document, &root.pipeline_config.mode.clone(), force_reprocess, cancellation)
        .await?;
    tracing::info!(document_id = %result.document_id, status = ?result.document_status, "resume finished");

    Ok(match result.document_status {
        docuflow_domain::entities::DocumentStatus::Completed => ExitCode::Success,
        docuflow_domain::entities::DocumentStatus::Failed => ExitCode::Software,
        _ => ExitCode::Success,
    })
}

async fn load_or_create_document(
    root: &composition_root::CompositionRoot,
    path: &Path,
) -> Result<Document, docuflow_domain::error::DocPipeError> {
    use docuflow_domain::repositories::DocumentRepository;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| docuflow_domain::error::DocPipeError::invalid_input(format!("cannot read {}: {err}", path.display())))?;
    let hash = ContentHash::of(&bytes);

    if let Some(existing) = root.document_repo.find_by_content_hash(&hash).await? {
        return Ok(existing);
    }

    let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
    let document = Document::new(filename, hash);
    root.document_repo.save(&document).await?;
    Ok(document)
}

fn run_validate_config(path: &Path) -> ExitCode {
    match config::load(Some(path)) {
        Ok(_) => {
            println!("{} is valid", path.display());
            ExitCode::Success
        }
        Err(err) => {
            eprintln!("{} is invalid: {err}", path.display());
            ExitCode::Config
        }
    }
}
