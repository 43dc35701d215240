// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::AdapterError;
use arc_core::config::PipelineConfig;
use async_trait::async_trait;
use std::path::PathBuf;

/// Resolves the effective [`PipelineConfig`] for a run. An explicit
/// admin-managed override file wins over the base file, matching the
/// teacher's runbook loader precedence (explicit beats default).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<PipelineConfig, AdapterError>;
}

/// Reads `base_path`, then if `override_path` exists re-reads and returns
/// that instead. Both are plain TOML files in [`PipelineConfig`]'s shape.
pub struct FileConfigStore {
    base_path: PathBuf,
    override_path: Option<PathBuf>,
}

impl FileConfigStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), override_path: None }
    }

    pub fn with_override(mut self, override_path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(override_path.into());
        self
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<PipelineConfig, AdapterError> {
        if let Some(override_path) = &self.override_path {
            if override_path.is_file() {
                return Ok(PipelineConfig::load(override_path)?);
            }
        }
        if self.base_path.is_file() {
            return Ok(PipelineConfig::load(&self.base_path)?);
        }
        Ok(PipelineConfig::default())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, ConfigStore};
    use arc_core::config::PipelineConfig;
    use async_trait::async_trait;

    /// Returns a fixed, pre-built config.
    pub struct FakeConfigStore(pub PipelineConfig);

    #[async_trait]
    impl ConfigStore for FakeConfigStore {
        async fn load(&self) -> Result<PipelineConfig, AdapterError> {
            Ok(self.0.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConfigStore;
