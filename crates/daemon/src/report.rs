// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles a [`JobReport`] for `get_report` (spec §6): the execution
//! manifest the Executor wrote under `reports_root`, plus every
//! `version_history.json` the version-chain archiver left scattered
//! through the job's working tree.

use arc_core::config::PipelineConfig;
use arc_core::job::JobId;
use arc_wire::{ExecutionManifest, JobReport, VersionChainManifest};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no report for job {0}: executor has not written a manifest yet")]
    NotFound(JobId),
    #[error("io error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },
    #[error("malformed manifest at {path}: {source}")]
    Json { path: std::path::PathBuf, source: serde_json::Error },
}

/// Read the manifest `executor::run` wrote to `reports_root`, then walk
/// the job's working tree collecting any `version_history.json` files the
/// version-chain archiver left behind (spec §4.7, §6).
pub fn build(config: &PipelineConfig, job_id: JobId) -> Result<JobReport, ReportError> {
    let manifest_path = config.reports_root.join(format!("{}_manifest.json", job_id.as_str()));
    if !manifest_path.is_file() {
        return Err(ReportError::NotFound(job_id));
    }
    let body = std::fs::read_to_string(&manifest_path)
        .map_err(|e| ReportError::Io { path: manifest_path.clone(), source: e })?;
    let manifest: ExecutionManifest =
        serde_json::from_str(&body).map_err(|e| ReportError::Json { path: manifest_path, source: e })?;

    let working_root = config.working_root.join(job_id.as_str());
    let mut version_chains = Vec::new();
    if working_root.is_dir() {
        for entry in WalkDir::new(&working_root).into_iter().filter_map(Result::ok) {
            if entry.file_name() != "version_history.json" {
                continue;
            }
            let Ok(body) = std::fs::read_to_string(entry.path()) else { continue };
            if let Ok(chain) = serde_json::from_str::<VersionChainManifest>(&body) {
                version_chains.push(chain);
            }
        }
    }

    Ok(JobReport { manifest, version_chains })
}
