// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the phase engine and job controller.

use arc_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] arc_store::StoreError),

    #[error("extract error: {0}")]
    Extract(#[from] arc_extract::ExtractError),

    #[error("llm error: {0}")]
    Llm(#[from] arc_llm::LlmError),

    #[error("filesystem error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error("planning incomplete: {message}")]
    PlanningIncomplete { message: String },

    #[error("plan validation failed: {message}")]
    Validation { message: String },

    #[error("plan conflict: {message}")]
    Conflict { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invariant breach: {message}")]
    Fatal { message: String },
}

impl EngineError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Store(e) => e.kind(),
            EngineError::Extract(e) => e.kind(),
            EngineError::Llm(e) => e.kind(),
            EngineError::Io { .. } => ErrorKind::Io,
            EngineError::PlanningIncomplete { .. } => ErrorKind::PlanningIncomplete,
            EngineError::Validation { .. } => ErrorKind::Validation,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}
