// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration surface of spec §6, loaded from TOML with `Default`
//! fallbacks the way the teacher's runbook/container config loads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Strategy for archiving superseded version-chain members (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionArchiveStrategy {
    Subfolder,
    Inline,
    SeparateArchive,
}

impl Default for VersionArchiveStrategy {
    fn default() -> Self {
        VersionArchiveStrategy::Subfolder
    }
}

crate::simple_display! {
    VersionArchiveStrategy {
        Subfolder => "subfolder",
        Inline => "inline",
        SeparateArchive => "separate_archive",
    }
}

/// Worker pool sizing, split between CPU-bound and network-bound phases (spec §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerPoolSize {
    pub cpu: usize,
    pub net: usize,
}

impl Default for WorkerPoolSize {
    fn default() -> Self {
        Self { cpu: 8, net: 4 }
    }
}

/// LLM endpoint configuration shared by the local and remote clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEndpointConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_tokens: u32,
}

impl Default for LlmEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "local-summarizer".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            max_tokens: 512,
        }
    }
}

fn default_remote_llm() -> LlmEndpointConfig {
    LlmEndpointConfig {
        endpoint: "https://api.anthropic.com/v1/messages".to_string(),
        model: "remote-planner".to_string(),
        timeout_secs: 180,
        max_retries: 3,
        max_tokens: 8192,
    }
}

/// The full configuration surface enumerated in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_root: PathBuf,
    pub working_root: PathBuf,
    pub output_root: PathBuf,
    pub reports_root: PathBuf,

    pub batch_size: u32,
    /// Minimum seconds between progress reports even if fewer than
    /// `batch_size` items have completed since the last one (spec §5:
    /// "reported at least every P items or every T seconds").
    pub progress_interval_secs: u64,
    pub review_required: bool,
    pub dry_run: bool,
    /// Skip top-level directories whose name starts with `.` during indexing (spec §4.5).
    pub skip_hidden_top_level_dirs: bool,

    pub version_archive_strategy: VersionArchiveStrategy,
    pub version_folder_name: String,
    pub similarity_threshold: f64,

    pub text_extraction_budget_bytes: u64,

    pub local_llm: LlmEndpointConfig,
    pub remote_llm: LlmEndpointConfig,

    pub worker_pool_size: WorkerPoolSize,
    pub allow_deletes: bool,

    /// Fraction of failed per-operation executor steps (0.0-1.0) tolerated
    /// before the Executor aborts early. Default 1.0 (never abort, report).
    pub executor_failure_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("/data/source"),
            working_root: PathBuf::from("/data/working"),
            output_root: PathBuf::from("/data/output"),
            reports_root: PathBuf::from("/data/reports"),
            batch_size: 50,
            progress_interval_secs: 5,
            review_required: false,
            dry_run: false,
            skip_hidden_top_level_dirs: true,
            version_archive_strategy: VersionArchiveStrategy::default(),
            version_folder_name: "_versions".to_string(),
            similarity_threshold: 0.7,
            text_extraction_budget_bytes: 100 * 1024,
            local_llm: LlmEndpointConfig::default(),
            remote_llm: default_remote_llm(),
            worker_pool_size: WorkerPoolSize::default(),
            allow_deletes: false,
            executor_failure_threshold: 1.0,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file, falling back to defaults for any field the
    /// file doesn't set (via `#[serde(default)]` on the struct).
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
    }

    /// The upper size bound above which a file is hashed and indexed but
    /// its text extraction is skipped (spec §4.1).
    pub fn skip_extraction_above_bytes(&self) -> u64 {
        self.text_extraction_budget_bytes * 50
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}
