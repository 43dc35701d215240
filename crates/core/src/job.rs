// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine (spec §3, §4.10).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a pipeline job run.
    pub struct JobId("job-");
}

/// Status of a [`Job`], following the linear pipeline with `failed`/`cancelled`
/// reachable from any non-terminal state (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Extracting,
    Indexing,
    Deduplicating,
    Versioning,
    Organizing,
    ReviewRequired,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Extracting => "extracting",
        Indexing => "indexing",
        Deduplicating => "deduplicating",
        Versioning => "versioning",
        Organizing => "organizing",
        ReviewRequired => "review_required",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    /// Ordinal position within the linear (non-terminal-failure) sequence.
    /// Used to check monotonic progress (spec §8 P1); `None` for the
    /// always-reachable failure states, which aren't part of the order.
    pub fn phase_rank(self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Extracting => Some(1),
            JobStatus::Indexing => Some(2),
            JobStatus::Deduplicating => Some(3),
            JobStatus::Versioning => Some(4),
            JobStatus::Organizing => Some(5),
            JobStatus::ReviewRequired => Some(6),
            JobStatus::Executing => Some(7),
            JobStatus::Completed => Some(8),
            JobStatus::Failed | JobStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// The status that follows this one in the normal pipeline, or `None`
    /// if this is the last regular phase before `completed`, or this status
    /// is already terminal. `review_gate` controls whether `organizing`
    /// advances straight to `executing` or pauses at `review_required`.
    pub fn next(self, review_gate: bool) -> Option<JobStatus> {
        match self {
            JobStatus::Pending => Some(JobStatus::Extracting),
            JobStatus::Extracting => Some(JobStatus::Indexing),
            JobStatus::Indexing => Some(JobStatus::Deduplicating),
            JobStatus::Deduplicating => Some(JobStatus::Versioning),
            JobStatus::Versioning => Some(JobStatus::Organizing),
            JobStatus::Organizing => {
                Some(if review_gate { JobStatus::ReviewRequired } else { JobStatus::Executing })
            }
            JobStatus::ReviewRequired => Some(JobStatus::Executing),
            JobStatus::Executing => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => None,
        }
    }
}

/// Per-job counters accumulated across phases (spec §3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobCounters {
    pub files_processed: u64,
    pub duplicates_found: u64,
    pub shortcuts_created: u64,
    pub version_chains_found: u64,
    pub files_renamed: u64,
    pub files_moved: u64,
}

/// A pipeline job instance (spec §3 `Job`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Human-readable sub-phase label, e.g. which batch index the Indexer
    /// is processing; informational only, not part of the state machine.
    pub current_phase: Option<String>,
    pub progress: u8,
    pub source_archive_path: PathBuf,
    pub output_archive_path: PathBuf,
    pub counters: JobCounters,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub error_message: Option<String>,
    /// Whether a human review gate sits between organizing and executing.
    pub review_required: bool,
}

impl Job {
    pub fn new(
        source_archive_path: PathBuf,
        output_archive_path: PathBuf,
        review_required: bool,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            current_phase: None,
            progress: 0,
            source_archive_path,
            output_archive_path,
            counters: JobCounters::default(),
            created_at_ms: epoch_ms,
            started_at_ms: None,
            completed_at_ms: None,
            error_message: None,
            review_required,
        }
    }

    /// Advance to the next phase in sequence. Returns `false` if already terminal.
    pub fn advance(&mut self, epoch_ms: u64) -> bool {
        let Some(next) = self.status.next(self.review_required) else {
            return false;
        };
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(epoch_ms);
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at_ms = Some(epoch_ms);
        }
        true
    }

    pub fn fail(&mut self, message: impl Into<String>, epoch_ms: u64) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at_ms = Some(epoch_ms);
    }

    pub fn cancel(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Cancelled;
        self.completed_at_ms = Some(epoch_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_advance_without_review_gate() {
        let mut job = Job::new(PathBuf::from("/data/input/a.zip"), PathBuf::from("/data/output/a.zip"), false, 0);
        let sequence = [
            JobStatus::Extracting,
            JobStatus::Indexing,
            JobStatus::Deduplicating,
            JobStatus::Versioning,
            JobStatus::Organizing,
            JobStatus::Executing,
            JobStatus::Completed,
        ];
        for expected in sequence {
            assert!(job.advance(1));
            assert_eq!(job.status, expected);
        }
        assert!(!job.advance(2));
    }

    #[test]
    fn review_gate_inserts_review_required() {
        let mut job = Job::new(PathBuf::from("/in.zip"), PathBuf::from("/out.zip"), true, 0);
        for _ in 0..5 {
            job.advance(1);
        }
        assert_eq!(job.status, JobStatus::Organizing);
        job.advance(1);
        assert_eq!(job.status, JobStatus::ReviewRequired);
        job.advance(1);
        assert_eq!(job.status, JobStatus::Executing);
    }

    #[test]
    fn fail_and_cancel_are_terminal() {
        let mut job = Job::new(PathBuf::from("/in.zip"), PathBuf::from("/out.zip"), false, 0);
        job.fail("boom", 5);
        assert!(job.status.is_terminal());
        assert_eq!(job.error_message.as_deref(), Some("boom"));

        let mut job2 = Job::new(PathBuf::from("/in.zip"), PathBuf::from("/out.zip"), false, 0);
        job2.cancel(7);
        assert!(job2.status.is_terminal());
        assert_eq!(job2.completed_at_ms, Some(7));
    }

    #[test]
    fn phase_rank_is_monotonic_along_the_happy_path() {
        let ranks: Vec<u8> = [
            JobStatus::Pending,
            JobStatus::Extracting,
            JobStatus::Indexing,
            JobStatus::Deduplicating,
            JobStatus::Versioning,
            JobStatus::Organizing,
            JobStatus::ReviewRequired,
            JobStatus::Executing,
            JobStatus::Completed,
        ]
        .into_iter()
        .map(|s| s.phase_rank().unwrap())
        .collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }
}
