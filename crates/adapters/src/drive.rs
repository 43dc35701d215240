// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::AdapterError;
use async_trait::async_trait;
use std::path::Path;

/// Uploads a packaged output archive to wherever the organized tree is
/// meant to land. The engine never depends on a concrete cloud SDK; it
/// only sees this trait.
#[async_trait]
pub trait CloudDriveConnector: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<(), AdapterError>;
}

/// Logs the upload and does nothing else. Used until a real connector
/// (S3, Drive, etc.) is configured.
#[derive(Clone, Copy, Default)]
pub struct NoopDriveConnector;

#[async_trait]
impl CloudDriveConnector for NoopDriveConnector {
    async fn upload(&self, path: &Path) -> Result<(), AdapterError> {
        tracing::info!(path = %path.display(), "cloud upload skipped (noop connector)");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, CloudDriveConnector};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    pub struct FakeDriveConnector {
        uploads: Mutex<Vec<PathBuf>>,
    }

    impl FakeDriveConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn uploads(&self) -> Vec<PathBuf> {
            self.uploads.lock().clone()
        }
    }

    #[async_trait]
    impl CloudDriveConnector for FakeDriveConnector {
        async fn upload(&self, path: &Path) -> Result<(), AdapterError> {
            self.uploads.lock().push(path.to_path_buf());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDriveConnector;
