// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and lifecycle errors for `arcd`, distinct from [`arc_engine::EngineError`]
//! which covers failures inside a running job.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine a state directory: set ARC_STATE_DIR or HOME")]
    NoStateDir,

    #[error("config error: {0}")]
    Config(#[from] arc_adapters::AdapterError),

    #[error("store error: {0}")]
    Store(#[from] arc_store::StoreError),

    #[error("llm client error: {0}")]
    Llm(#[from] arc_llm::LlmError),

    #[error("io error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },
}

impl DaemonError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
