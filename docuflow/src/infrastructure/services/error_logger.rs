// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite + Daily-File Error Logger
//!
//! Every call inserts a `pipeline_errors` row through
//! [`PipelineErrorRepository`] and appends one JSON line to
//! `{log_dir}/pipeline-errors-{date}.jsonl`. If the repository write fails,
//! the failure degrades to file-only logging with a `tracing::warn!` —
//! `log_failure` itself never returns an error the caller has to handle,
//! per the contract that logging a failure must never become a new one.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

use docuflow_domain::entities::PipelineErrorRecord;
use docuflow_domain::error::DocPipeError;
use docuflow_domain::repositories::PipelineErrorRepository;
use docuflow_domain::services::ErrorLogger;

pub struct SqliteFileErrorLogger {
    repository: Arc<dyn PipelineErrorRepository>,
    log_dir: PathBuf,
    // Serializes appends to the day's file; tokio::fs has no O_APPEND
    // atomicity guarantee across concurrent writers on all platforms.
    file_lock: AsyncMutex<()>,
}

impl SqliteFileErrorLogger {
    pub fn new(repository: Arc<dyn PipelineErrorRepository>, log_dir: PathBuf) -> Self {
        Self {
            repository,
            log_dir,
            file_lock: AsyncMutex::new(()),
        }
    }

    fn path_for_today(&self) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d");
        self.log_dir.join(format!("pipeline-errors-{date}.jsonl"))
    }

    async fn append_to_file(&self, record: &PipelineErrorRecord) -> Result<(), DocPipeError> {
        let _guard = self.file_lock.lock().await;
        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|e| DocPipeError::internal(format!("failed to create log directory: {e}")))?;

        let mut line = serde_json::to_string(record).map_err(DocPipeError::from)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for_today())
            .await
            .map_err(|e| DocPipeError::internal(format!("failed to open daily error log: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DocPipeError::internal(format!("failed to append to daily error log: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ErrorLogger for SqliteFileErrorLogger {
    async fn log_failure(&self, record: &PipelineErrorRecord) -> Result<(), DocPipeError> {
        if let Err(err) = self.repository.insert(record).await {
            tracing::warn!(
                document_id = %record.document_id,
                stage = %record.stage,
                error = %err,
                "failed to persist pipeline_errors row; degrading to file-only logging"
            );
        }

        if let Err(err) = self.append_to_file(record).await {
            tracing::warn!(error = %err, "failed to append pipeline error to daily log file");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docuflow_domain::value_objects::{CorrelationId, DocumentId, RequestId, StageName};
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct InMemoryErrors(StdMutex<Vec<PipelineErrorRecord>>);

    #[async_trait]
    impl PipelineErrorRepository for InMemoryErrors {
        async fn insert(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().push(error.clone());
            Ok(())
        }
        async fn update(&self, error: &PipelineErrorRecord) -> Result<(), DocPipeError> {
            self.0.lock().unwrap().push(error.clone());
            Ok(())
        }
        async fn find_by_id(&self, _id: uuid::Uuid) -> Result<Option<PipelineErrorRecord>, DocPipeError> {
            Ok(None)
        }
        async fn list_for_document(&self, _document_id: DocumentId) -> Result<Vec<PipelineErrorRecord>, DocPipeError> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    fn sample_record() -> PipelineErrorRecord {
        PipelineErrorRecord::new(
            DocumentId::new(),
            StageName::Embedding,
            docuflow_domain::error::ErrorCategory::ExternalTransient,
            "timeout",
            None,
            0,
            3,
            CorrelationId::new(RequestId::new(), StageName::Embedding, 0),
        )
    }

    #[tokio::test]
    async fn writes_both_the_repository_row_and_the_daily_file() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(InMemoryErrors::default());
        let logger = SqliteFileErrorLogger::new(repo.clone(), dir.path().to_path_buf());

        let record = sample_record();
        logger.log_failure(&record).await.unwrap();

        assert_eq!(repo.0.lock().unwrap().len(), 1);

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut found = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let contents = tokio::fs::read_to_string(entry.path()).await.unwrap();
            assert!(contents.contains(&record.id.to_string()));
            found = true;
        }
        assert!(found, "expected a daily log file to be written");
    }

    #[tokio::test]
    async fn multiple_failures_append_as_separate_lines() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(InMemoryErrors::default());
        let logger = SqliteFileErrorLogger::new(repo, dir.path().to_path_buf());

        logger.log_failure(&sample_record()).await.unwrap();
        logger.log_failure(&sample_record()).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let contents = tokio::fs::read_to_string(entry.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
