// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::AdapterError;
use arc_core::JobId;
use async_trait::async_trait;

/// Blocks a job in `review_required` until a human (or an HTTP front-end
/// standing in for one) approves it. The engine only sees this trait;
/// swapping the local CLI prompt for a web UI never touches it.
#[async_trait]
pub trait ReviewFrontend: Send + Sync {
    async fn await_approval(&self, job: JobId) -> Result<(), AdapterError>;
}

/// Prompts on stdin/stdout. Suitable for a single-operator local run; a
/// production deployment swaps this for an HTTP-backed frontend that the
/// controller polls or is notified from, without recompiling the engine.
pub struct CliReviewFrontend;

#[async_trait]
impl ReviewFrontend for CliReviewFrontend {
    async fn await_approval(&self, job: JobId) -> Result<(), AdapterError> {
        tokio::task::spawn_blocking(move || {
            println!("job {job} is awaiting review; type 'approve' to continue:");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map_err(|e| AdapterError::Io {
                path: std::path::PathBuf::from("<stdin>"),
                source: e,
            })?;
            if line.trim() == "approve" {
                Ok(())
            } else {
                Err(AdapterError::ReviewDenied(format!("unrecognized input: {}", line.trim())))
            }
        })
        .await
        .map_err(|e| AdapterError::Io {
            path: std::path::PathBuf::from("<stdin>"),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, ReviewFrontend};
    use arc_core::JobId;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Approves any job whose id has been pre-seeded via [`Self::approve`].
    #[derive(Default)]
    pub struct FakeReviewFrontend {
        approved: Mutex<HashSet<JobId>>,
    }

    impl FakeReviewFrontend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn approve(&self, job: JobId) {
            self.approved.lock().insert(job);
        }
    }

    #[async_trait]
    impl ReviewFrontend for FakeReviewFrontend {
        async fn await_approval(&self, job: JobId) -> Result<(), AdapterError> {
            if self.approved.lock().contains(&job) {
                Ok(())
            } else {
                Err(AdapterError::ReviewDenied(format!("{job} not yet approved")))
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeReviewFrontend;

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::job::JobId;

    #[tokio::test]
    async fn fake_frontend_rejects_until_approved() {
        let frontend = FakeReviewFrontend::new();
        let job_id = JobId::new();
        assert!(frontend.await_approval(job_id).await.is_err());
        frontend.approve(job_id);
        assert!(frontend.await_approval(job_id).await.is_ok());
    }
}
