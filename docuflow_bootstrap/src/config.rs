// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Layered Configuration
//!
//! Compiled-in defaults, overridden by an optional TOML file, overridden by
//! `DOCUFLOW_*` environment variables. Every key is validated eagerly
//! at load time so a misconfiguration fails fast with an actionable message
//! rather than surfacing later as a cryptic runtime error.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use docuflow::application::config::{PipelineConfig, RunMode};

/// Ambient, non-scheduling configuration layered on top of
/// [`docuflow::application::config::PipelineConfig`].
#[derive(Debug, Clone)]
pub struct DocuflowConfig {
    pub pipeline: PipelineConfig,
    pub log_level: String,
    pub log_directory: Option<String>,
    pub metrics_bind_address: String,
    pub database_url: String,
    pub object_store_root: String,
    pub embedding_endpoint: Option<String>,
    pub embedding_dimension: usize,
}

impl Default for DocuflowConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            log_level: "info".to_string(),
            log_directory: None,
            metrics_bind_address: "127.0.0.1:9898".to_string(),
            database_url: "sqlite://docuflow.db".to_string(),
            object_store_root: "./object-store".to_string(),
            embedding_endpoint: None,
            embedding_dimension: 256,
        }
    }
}

/// Mirrors [`DocuflowConfig`] but every field is optional, for deserializing
/// a partial TOML document. `None` means "keep the default or whatever an
/// earlier layer already set."
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    concurrency: RawConcurrency,
    retry: RawRetry,
    policy_cache: RawPolicyCache,
    mode: Option<String>,
    force_reprocess: Option<bool>,
    optional_stages: RawOptionalStages,
    log: RawLog,
    metrics: RawMetrics,
    database: RawDatabase,
    object_store: RawObjectStore,
    embedding: RawEmbedding,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConcurrency {
    max_documents: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRetry {
    default_max_retries: Option<u32>,
    default_base_delay_seconds: Option<u64>,
    default_max_delay_seconds: Option<u64>,
    default_exponential_base: Option<f64>,
    default_jitter_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPolicyCache {
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptionalStages {
    continue_on_failure: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLog {
    level: Option<String>,
    directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetrics {
    bind_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDatabase {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawObjectStore {
    root: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEmbedding {
    endpoint: Option<String>,
    dimension: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads defaults, then a TOML file (if given), then `DOCUFLOW_*` environment
/// overrides, validating the merged result before returning it.
pub fn load(file_path: Option<&Path>) -> Result<DocuflowConfig, ConfigError> {
    let raw = match file_path {
        Some(path) => parse_file(path)?,
        None => RawConfig::default(),
    };

    let mut config = DocuflowConfig::default();
    apply_raw(&mut config, raw)?;
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn apply_raw(config: &mut DocuflowConfig, raw: RawConfig) -> Result<(), ConfigError> {
    if let Some(v) = raw.concurrency.max_documents {
        config.pipeline.max_documents = v;
    }
    if let Some(v) = raw.retry.default_max_retries {
        config.pipeline.default_max_retries = v;
    }
    if let Some(v) = raw.retry.default_base_delay_seconds {
        config.pipeline.default_base_delay = Duration::from_secs(v);
    }
    if let Some(v) = raw.retry.default_max_delay_seconds {
        config.pipeline.default_max_delay = Duration::from_secs(v);
    }
    if let Some(v) = raw.retry.default_exponential_base {
        config.pipeline.default_exponential_base = v;
    }
    if let Some(v) = raw.retry.default_jitter_enabled {
        config.pipeline.default_jitter_enabled = v;
    }
    if let Some(v) = raw.policy_cache.ttl_seconds {
        config.pipeline.policy_cache_ttl = Duration::from_secs(v);
    }
    if let Some(v) = raw.mode {
        config.pipeline.mode = parse_mode(&v)?;
    }
    if let Some(v) = raw.force_reprocess {
        config.pipeline.force_reprocess = v;
    }
    if let Some(v) = raw.optional_stages.continue_on_failure {
        config.pipeline.optional_stages_continue_on_failure = v;
    }
    if let Some(v) = raw.log.level {
        config.log_level = v;
    }
    if let Some(v) = raw.log.directory {
        config.log_directory = Some(v);
    }
    if let Some(v) = raw.metrics.bind_address {
        config.metrics_bind_address = v;
    }
    if let Some(v) = raw.database.url {
        config.database_url = v;
    }
    if let Some(v) = raw.object_store.root {
        config.object_store_root = v;
    }
    if let Some(v) = raw.embedding.endpoint {
        config.embedding_endpoint = Some(v);
    }
    if let Some(v) = raw.embedding.dimension {
        config.embedding_dimension = v;
    }
    Ok(())
}

fn parse_mode(raw: &str) -> Result<RunMode, ConfigError> {
    match raw {
        "run_all" | "full" => Ok(RunMode::RunAll),
        "smart" => Ok(RunMode::Smart),
        other => Err(ConfigError::Invalid(format!(
            "unknown mode '{other}' (expected 'run_all' or 'smart'; 'run_subset' is only reachable via the CLI)"
        ))),
    }
}

fn apply_env_overrides(config: &mut DocuflowConfig) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("DOCUFLOW_CONCURRENCY_MAX_DOCUMENTS") {
        config.pipeline.max_documents = v
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("DOCUFLOW_CONCURRENCY_MAX_DOCUMENTS: not a number: {v}")))?;
    }
    if let Ok(v) = std::env::var("DOCUFLOW_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("DOCUFLOW_METRICS_BIND_ADDRESS") {
        config.metrics_bind_address = v;
    }
    if let Ok(v) = std::env::var("DOCUFLOW_DATABASE_URL") {
        config.database_url = v;
    }
    if let Ok(v) = std::env::var("DOCUFLOW_OBJECT_STORE_ROOT") {
        config.object_store_root = v;
    }
    if let Ok(v) = std::env::var("DOCUFLOW_EMBEDDING_ENDPOINT") {
        config.embedding_endpoint = Some(v);
    }
    Ok(())
}

fn validate(config: &DocuflowConfig) -> Result<(), ConfigError> {
    if config.pipeline.max_documents == 0 {
        return Err(ConfigError::Invalid("concurrency.max_documents must be at least 1".to_string()));
    }
    if config.pipeline.default_exponential_base <= 1.0 {
        return Err(ConfigError::Invalid("retry.default_exponential_base must be greater than 1.0".to_string()));
    }
    if config.embedding_dimension == 0 {
        return Err(ConfigError::Invalid("embedding.dimension must be at least 1".to_string()));
    }
    if !["error", "warn", "info", "debug", "trace"].contains(&config.log_level.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "log.level must be one of error/warn/info/debug/trace, got '{}'",
            config.log_level
        )));
    }
    if config.database_url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = DocuflowConfig::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn toml_overrides_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docuflow.toml");
        std::fs::write(&path, "[concurrency]\nmax_documents = 16\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.pipeline.max_documents, 16);
    }

    #[test]
    fn rejects_zero_max_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docuflow.toml");
        std::fs::write(&path, "[concurrency]\nmax_documents = 0\n").unwrap();

        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docuflow.toml");
        std::fs::write(&path, "[log]\nlevel = \"verbose\"\n").unwrap();

        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
