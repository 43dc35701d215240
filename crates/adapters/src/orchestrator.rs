// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arc_core::JobId;
use async_trait::async_trait;

/// Notified by the job controller as a job crosses phase boundaries,
/// matching the `callback_url` hook of spec §6. The controller does not
/// know or care whether this fans out to a webhook, a message queue, or
/// nothing at all.
#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    async fn notify_phase(&self, job: JobId, phase: &str);
}

/// No `callback_url` configured for the job; drop the notification.
#[derive(Clone, Copy, Default)]
pub struct NoopOrchestrator;

#[async_trait]
impl WorkflowOrchestrator for NoopOrchestrator {
    async fn notify_phase(&self, job: JobId, phase: &str) {
        tracing::debug!(%job, phase, "phase transition (no callback configured)");
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::WorkflowOrchestrator;
    use arc_core::JobId;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct FakeOrchestrator {
        notifications: Mutex<Vec<(JobId, String)>>,
    }

    impl FakeOrchestrator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn notifications(&self) -> Vec<(JobId, String)> {
            self.notifications.lock().clone()
        }
    }

    #[async_trait]
    impl WorkflowOrchestrator for FakeOrchestrator {
        async fn notify_phase(&self, job: JobId, phase: &str) {
            self.notifications.lock().push((job, phase.to_string()));
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeOrchestrator;
