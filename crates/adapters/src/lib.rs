// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait-per-collaborator seams between the engine/controller and the
//! outside world (filesystem deposit, cloud upload, human review, config
//! source), mirroring the teacher's `AgentAdapter` pattern: one trait,
//! one production backend, one fake gated behind `test-support`.

pub mod config_store;
pub mod drive;
pub mod fetcher;
pub mod orchestrator;
pub mod review;

pub use config_store::{ConfigStore, FileConfigStore};
pub use drive::{CloudDriveConnector, NoopDriveConnector};
pub use fetcher::{Fetcher, LocalFetcher};
pub use orchestrator::{NoopOrchestrator, WorkflowOrchestrator};
pub use review::{CliReviewFrontend, ReviewFrontend};

use thiserror::Error;

/// Errors common to every adapter in this crate.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("io error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },
    #[error("config error: {0}")]
    Config(#[from] arc_core::config::ConfigError),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("review denied: {0}")]
    ReviewDenied(String),
}

impl AdapterError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
