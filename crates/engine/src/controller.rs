// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job controller: the state machine of spec §4.10. Each call to
//! [`JobController::advance`] computes the next status, persists it
//! *before* running the phase that status names (write-ahead, per spec
//! §4.10 "transitions are persisted before the new phase begins"), then
//! runs that phase. A crash between the two resumes by re-entering the
//! same phase against rows its own upserts already moved forward —
//! idempotent by construction, not by replaying a log.

use crate::error::EngineError;
use crate::phases::{duplicate_resolver, executor, indexer, organization_planner, version_resolver, PhaseContext};
use crate::progress::{NoopProgressSink, ProgressSink};
use arc_core::job::{Job, JobId, JobStatus};
use arc_core::{Clock, PipelineConfig};
use arc_extract::ExtractorRegistry;
use arc_llm::{LocalLlmClient, RemoteLlmClient};
use arc_store::jobs;
use arc_store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collaborators a [`JobController`] needs beyond the store, grouped so
/// callers (the daemon, or a test) build one value instead of threading
/// several constructor arguments.
pub struct ControllerDeps {
    pub config: PipelineConfig,
    pub extractors: Arc<ExtractorRegistry>,
    pub local_llm: Arc<dyn LocalLlmClient>,
    pub remote_llm: Arc<dyn RemoteLlmClient>,
}

/// Owns job state transitions. `C: Clock` is threaded through to every
/// phase so tests can control time with a [`arc_core::FakeClock`].
pub struct JobController<C: Clock> {
    store: Arc<Store>,
    clock: C,
    deps: ControllerDeps,
    cancel_tokens: Mutex<HashMap<JobId, CancellationToken>>,
}

impl<C: Clock> JobController<C> {
    pub fn new(store: Arc<Store>, clock: C, deps: ControllerDeps) -> Self {
        Self { store, clock, deps, cancel_tokens: Mutex::new(HashMap::new()) }
    }

    /// Create a new `Job` row in `pending` status. Phases run via
    /// [`Self::advance`] or [`Self::run_to_completion`], not here.
    pub fn submit(
        &self,
        source_archive_path: std::path::PathBuf,
        output_archive_path: std::path::PathBuf,
        review_required: bool,
    ) -> Result<JobId, EngineError> {
        let job = Job::new(source_archive_path, output_archive_path, review_required, self.clock.epoch_ms());
        let job_id = job.id;
        self.store.with_transaction(|tx| jobs::upsert(tx, &job))?;
        self.cancel_tokens.lock().insert(job_id, CancellationToken::new());
        Ok(job_id)
    }

    /// Cooperative cancellation: flips the token every phase checks at
    /// bounded intervals, and marks the job `cancelled` immediately so
    /// `get_status` reflects the request even before a running phase
    /// notices the token.
    pub fn cancel(&self, job_id: JobId) -> Result<(), EngineError> {
        if let Some(token) = self.cancel_tokens.lock().get(&job_id) {
            token.cancel();
        }
        self.mark_cancelled_if_not_terminal(job_id)?;
        Ok(())
    }

    /// External approval signal for a job parked at `review_required`
    /// (spec §4.10 "the controller blocks until an external signal flips
    /// the job to `executing`"). Unlike [`Self::advance`], this steps past
    /// the review gate deliberately, then runs `executing` immediately.
    pub async fn approve(&self, job_id: JobId) -> Result<JobStatus, EngineError> {
        let job = self.require_job(job_id)?;
        if job.status != JobStatus::ReviewRequired {
            return Err(EngineError::Validation {
                message: format!("job {job_id} is not awaiting review (status: {})", job.status),
            });
        }
        self.step(job_id, job).await
    }

    /// Run one phase and persist the resulting transition. No-op and
    /// returns the current status if the job is terminal or parked at
    /// `review_required` awaiting [`Self::approve`].
    pub async fn advance(&self, job_id: JobId) -> Result<JobStatus, EngineError> {
        let job = self.require_job(job_id)?;
        if job.status.is_terminal() || job.status == JobStatus::ReviewRequired {
            return Ok(job.status);
        }
        self.step(job_id, job).await
    }

    /// Compute `job.status.next()`, persist it write-ahead, then run the
    /// phase it names. Shared by [`Self::advance`] (ordinary stepping) and
    /// [`Self::approve`] (stepping past an already-confirmed review gate).
    async fn step(&self, job_id: JobId, mut job: Job) -> Result<JobStatus, EngineError> {
        let token = self.token_for(job_id);
        if token.is_cancelled() {
            return self.mark_cancelled_if_not_terminal(job_id);
        }

        let now = self.clock.epoch_ms();
        if !job.advance(now) {
            return Ok(job.status);
        }
        let next_status = job.status;
        self.store.with_transaction(|tx| jobs::upsert(tx, &job))?;

        let ctx = PhaseContext::new(self.store.clone(), self.clock.clone(), token.clone());
        match self.run_phase(&ctx, job_id, next_status).await {
            Ok(()) if token.is_cancelled() => self.mark_cancelled_if_not_terminal(job_id),
            Ok(()) => Ok(next_status),
            Err(error) => {
                let mut job = self.require_job(job_id)?;
                job.fail(error.to_string(), self.clock.epoch_ms());
                self.store.with_transaction(|tx| jobs::upsert(tx, &job))?;
                Err(error)
            }
        }
    }

    /// Drive `job_id` forward until it reaches a terminal status or parks
    /// at `review_required`.
    pub async fn run_to_completion(&self, job_id: JobId) -> Result<JobStatus, EngineError> {
        loop {
            let before = self.require_job(job_id)?.status;
            let after = self.advance(job_id).await?;
            if after.is_terminal() || after == JobStatus::ReviewRequired || after == before {
                return Ok(after);
            }
        }
    }

    /// Re-enter a job's current phase after a restart. Because every
    /// phase's writes are idempotent upserts keyed on deterministic
    /// identities, this is just [`Self::run_to_completion`] again, run
    /// against rows already partially advanced by the crashed attempt.
    pub async fn resume(&self, job_id: JobId) -> Result<JobStatus, EngineError> {
        self.cancel_tokens.lock().entry(job_id).or_insert_with(CancellationToken::new);
        self.run_to_completion(job_id).await
    }

    /// Run the phase named by `status`, which has already been persisted
    /// onto the job row by the caller. Counters that a phase's outcome
    /// maps cleanly onto [`arc_core::job::JobCounters`] are folded in here.
    async fn run_phase(&self, ctx: &PhaseContext<C>, job_id: JobId, status: JobStatus) -> Result<(), EngineError> {
        match status {
            JobStatus::Extracting => {
                let job = self.require_job(job_id)?;
                let dest = self.deps.config.source_root.join(job_id.as_str());
                arc_extract::unpack(&job.source_archive_path, &dest)?;
                Ok(())
            }
            JobStatus::Indexing => {
                let source_root = self.deps.config.source_root.join(job_id.as_str());
                let outcome = indexer::run(
                    ctx,
                    &source_root,
                    job_id,
                    &self.deps.config,
                    self.deps.extractors.clone(),
                    self.deps.local_llm.clone(),
                    &NoopProgressSink as &dyn ProgressSink,
                )
                .await?;
                self.update_counters(job_id, |c| c.files_processed = outcome.files_processed)?;
                Ok(())
            }
            JobStatus::Deduplicating => {
                let outcome = duplicate_resolver::run(
                    ctx,
                    job_id,
                    self.deps.config.allow_deletes,
                    self.deps.local_llm.as_ref(),
                )
                .await?;
                self.update_counters(job_id, |c| c.duplicates_found = outcome.groups_resolved)?;
                Ok(())
            }
            JobStatus::Versioning => {
                let outcome =
                    version_resolver::run(ctx, job_id, &self.deps.config, self.deps.local_llm.as_ref()).await?;
                self.update_counters(job_id, |c| c.version_chains_found = outcome.chains_created)?;
                Ok(())
            }
            JobStatus::Organizing => {
                organization_planner::run(ctx, job_id, self.deps.remote_llm.as_ref()).await?;
                Ok(())
            }
            JobStatus::ReviewRequired => Ok(()),
            JobStatus::Executing => {
                let job = self.require_job(job_id)?;
                let source_root = self.deps.config.source_root.join(job_id.as_str());
                let working_root = self.deps.config.working_root.join(job_id.as_str());
                let source_archive = job
                    .source_archive_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| job_id.as_str().to_string());
                let outcome = executor::run(
                    ctx,
                    job_id,
                    &source_root,
                    &working_root,
                    &self.deps.config.reports_root,
                    &source_archive,
                    &self.deps.config,
                )
                .await?;
                self.update_counters(job_id, |c| c.shortcuts_created = outcome.shortcuts_created)?;
                Ok(())
            }
            JobStatus::Pending | JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => Ok(()),
        }
    }

    fn update_counters(&self, job_id: JobId, f: impl FnOnce(&mut arc_core::job::JobCounters)) -> Result<(), EngineError> {
        let mut job = self.require_job(job_id)?;
        f(&mut job.counters);
        self.store.with_transaction(|tx| jobs::upsert(tx, &job))?;
        Ok(())
    }

    fn require_job(&self, job_id: JobId) -> Result<Job, EngineError> {
        self.store
            .with_read_only(|tx| jobs::get(tx, &job_id))?
            .ok_or_else(|| EngineError::Validation { message: format!("unknown job {job_id}") })
    }

    fn token_for(&self, job_id: JobId) -> CancellationToken {
        self.cancel_tokens.lock().entry(job_id).or_insert_with(CancellationToken::new).clone()
    }

    fn mark_cancelled_if_not_terminal(&self, job_id: JobId) -> Result<JobStatus, EngineError> {
        let mut job = self.require_job(job_id)?;
        if !job.status.is_terminal() {
            job.cancel(self.clock.epoch_ms());
            self.store.with_transaction(|tx| jobs::upsert(tx, &job))?;
        }
        Ok(job.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::FakeClock;
    use arc_llm::local::MockLocalLlmClient;
    use arc_llm::remote::MockRemoteLlmClient;

    fn write_zip(path: &std::path::Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options.clone()).unwrap();
            std::io::Write::write_all(&mut zip, body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn test_deps(config: PipelineConfig) -> ControllerDeps {
        ControllerDeps {
            config,
            extractors: Arc::new(ExtractorRegistry::with_defaults()),
            local_llm: Arc::new(MockLocalLlmClient::new(Vec::new())),
            remote_llm: Arc::new(MockRemoteLlmClient::new(Vec::new())),
        }
    }

    fn test_config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            source_root: dir.join("source"),
            working_root: dir.join("working"),
            output_root: dir.join("output"),
            reports_root: dir.join("reports"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_job() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[("a.txt", "hi")]);

        let job_id = controller.submit(archive, dir.path().join("out.zip"), false).unwrap();
        let job = store.with_read_only(|tx| jobs::get(tx, &job_id)).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn advance_from_pending_unpacks_archive_and_moves_to_extracting() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[("a.txt", "hi")]);

        let job_id = controller.submit(archive, dir.path().join("out.zip"), false).unwrap();
        let status = controller.advance(job_id).await.unwrap();
        assert_eq!(status, JobStatus::Extracting);
        assert!(dir.path().join("source").join(job_id.as_str()).join("a.txt").is_file());
    }

    #[tokio::test]
    async fn review_gate_blocks_advance_until_approved() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[]);

        let job_id = controller.submit(archive, dir.path().join("out.zip"), true).unwrap();
        let status = controller.run_to_completion(job_id).await.unwrap();
        assert_eq!(status, JobStatus::ReviewRequired);

        // Blocked: advancing again is a no-op while parked at the gate.
        let still = controller.advance(job_id).await.unwrap();
        assert_eq!(still, JobStatus::ReviewRequired);

        let after_approval = controller.approve(job_id).await.unwrap();
        assert_eq!(after_approval, JobStatus::Executing);
        let completed = controller.run_to_completion(job_id).await.unwrap();
        assert_eq!(completed, JobStatus::Completed);
    }

    #[tokio::test]
    async fn cancel_marks_job_cancelled_immediately() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[]);
        let job_id = controller.submit(archive, dir.path().join("out.zip"), false).unwrap();

        controller.cancel(job_id).unwrap();
        let job = store.with_read_only(|tx| jobs::get(tx, &job_id)).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);

        let status = controller.advance(job_id).await.unwrap();
        assert_eq!(status, JobStatus::Cancelled);
    }

    // An empty archive keeps every phase on its zero-items fast path
    // (spec §8's empty-source-tree edge case), so the run reaches
    // `completed` without needing a canned LLM plan response.

    #[tokio::test]
    async fn no_review_gate_runs_to_completion() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[]);

        let job_id = controller.submit(archive, dir.path().join("out.zip"), false).unwrap();
        let status = controller.run_to_completion(job_id).await.unwrap();
        assert_eq!(status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn resume_after_partial_run_reaches_completion() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let controller = JobController::new(store.clone(), FakeClock::new(), test_deps(test_config(dir.path())));
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[]);
        let job_id = controller.submit(archive, dir.path().join("out.zip"), false).unwrap();

        // Simulate a crash after the first phase by only advancing once.
        controller.advance(job_id).await.unwrap();

        let status = controller.resume(job_id).await.unwrap();
        assert_eq!(status, JobStatus::Completed);
    }
}
