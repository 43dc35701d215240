// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::AdapterError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Source of new source archives for the controller to pick up (spec §6
/// "a job is created ... by a file deposit into an input directory").
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Return the path of one newly-deposited archive, if any is waiting.
    async fn deposit(&self) -> Result<Option<PathBuf>, AdapterError>;
}

/// Watches a single directory for archive files and returns the first one
/// found in directory-listing order. Does not remove or move the file;
/// the caller is responsible for claiming it (e.g. by renaming into
/// `source_root/<job_id>`).
pub struct LocalFetcher {
    input_dir: PathBuf,
}

impl LocalFetcher {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self { input_dir: input_dir.into() }
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn deposit(&self) -> Result<Option<PathBuf>, AdapterError> {
        let dir = self.input_dir.clone();
        tokio::task::spawn_blocking(move || scan_dir(&dir))
            .await
            .map_err(|e| AdapterError::Io {
                path: dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?
    }
}

fn scan_dir(dir: &Path) -> Result<Option<PathBuf>, AdapterError> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| AdapterError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();
    Ok(entries.into_iter().next())
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, Fetcher};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Returns a fixed queue of deposits in order, then `None` forever.
    pub struct FakeFetcher {
        queue: Mutex<VecDeque<PathBuf>>,
    }

    impl FakeFetcher {
        pub fn new(deposits: Vec<PathBuf>) -> Self {
            Self { queue: Mutex::new(deposits.into()) }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn deposit(&self) -> Result<Option<PathBuf>, AdapterError> {
            Ok(self.queue.lock().pop_front())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFetcher;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fetcher_returns_first_file_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.zip"), b"b").unwrap();
        std::fs::write(dir.path().join("a.zip"), b"a").unwrap();
        let fetcher = LocalFetcher::new(dir.path());
        let found = fetcher.deposit().await.unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "a.zip");
    }

    #[tokio::test]
    async fn local_fetcher_returns_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFetcher::new(dir.path());
        assert!(fetcher.deposit().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fake_fetcher_drains_queue_then_returns_none() {
        let fetcher = FakeFetcher::new(vec![PathBuf::from("/data/input/a.zip")]);
        assert_eq!(fetcher.deposit().await.unwrap(), Some(PathBuf::from("/data/input/a.zip")));
        assert_eq!(fetcher.deposit().await.unwrap(), None);
    }
}
