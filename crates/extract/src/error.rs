// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for fingerprinting and text extraction.

use arc_core::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error reading {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("unsupported format for {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("corrupt document at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl ExtractError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unsupported { path: path.to_path_buf(), reason: reason.into() }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt { path: path.to_path_buf(), reason: reason.into() }
    }

    /// Map to the pipeline-wide classification (spec §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Io { .. } => ErrorKind::Io,
            ExtractError::Unsupported { .. } => ErrorKind::Unsupported,
            ExtractError::Corrupt { .. } => ErrorKind::Corrupt,
        }
    }
}
