// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ExecutionLogEntry`: one record per filesystem action the Executor takes
//! or attempts (spec §3, §4.9).

use crate::document_item::DocumentItemId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct ExecutionLogId("exl-");
}

/// The kind of filesystem action an `ExecutionLogEntry` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionAction {
    CreateDirectory,
    CopyFile,
    RenameFile,
    MoveFile,
    CreateShortcut,
    ArchiveVersion,
    Delete,
}

crate::simple_display! {
    ExecutionAction {
        CreateDirectory => "create_directory",
        CopyFile => "copy_file",
        RenameFile => "rename_file",
        MoveFile => "move_file",
        CreateShortcut => "create_shortcut",
        ArchiveVersion => "archive_version",
        Delete => "delete",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failed,
    SkippedDryRun,
}

crate::simple_display! {
    ExecutionOutcome {
        Success => "success",
        Failed => "failed",
        SkippedDryRun => "skipped_dry_run",
    }
}

/// One attempted filesystem action, written before it runs and updated with
/// its outcome (spec §4.9 "write-ahead the intended action, then perform it").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: ExecutionLogId,
    pub job_id: JobId,
    pub document_id: Option<DocumentItemId>,
    pub action: ExecutionAction,
    pub source_path: Option<String>,
    pub dest_path: String,
    pub outcome: ExecutionOutcome,
    pub error_message: Option<String>,
    pub sequence_number: u64,
    pub recorded_at_ms: u64,
}

impl ExecutionLogEntry {
    pub fn pending(
        job_id: JobId,
        document_id: Option<DocumentItemId>,
        action: ExecutionAction,
        source_path: Option<String>,
        dest_path: String,
        sequence_number: u64,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: ExecutionLogId::new(),
            job_id,
            document_id,
            action,
            source_path,
            dest_path,
            outcome: ExecutionOutcome::SkippedDryRun,
            error_message: None,
            sequence_number,
            recorded_at_ms: epoch_ms,
        }
    }

    pub fn mark_success(&mut self) {
        self.outcome = ExecutionOutcome::Success;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.outcome = ExecutionOutcome::Failed;
        self.error_message = Some(message.into());
    }
}

/// Compute the fraction of non-dry-run entries that failed, for the
/// executor's failure-threshold circuit breaker (spec §4.9, §6 `executor_failure_threshold`).
pub fn failure_rate(entries: &[ExecutionLogEntry]) -> f64 {
    let attempted: Vec<&ExecutionLogEntry> =
        entries.iter().filter(|e| e.outcome != ExecutionOutcome::SkippedDryRun).collect();
    if attempted.is_empty() {
        return 0.0;
    }
    let failed = attempted.iter().filter(|e| e.outcome == ExecutionOutcome::Failed).count();
    failed as f64 / attempted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_entry_defaults_to_skipped_dry_run() {
        let entry = ExecutionLogEntry::pending(
            JobId::new(),
            Some(DocumentItemId::new()),
            ExecutionAction::CopyFile,
            Some("A/report.pdf".into()),
            "Finance/report.pdf".into(),
            0,
            100,
        );
        assert_eq!(entry.outcome, ExecutionOutcome::SkippedDryRun);
    }

    #[test]
    fn mark_success_clears_error_message() {
        let mut entry = ExecutionLogEntry::pending(
            JobId::new(),
            None,
            ExecutionAction::CreateDirectory,
            None,
            "Finance".into(),
            1,
            100,
        );
        entry.mark_failed("disk full");
        entry.mark_success();
        assert_eq!(entry.outcome, ExecutionOutcome::Success);
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn failure_rate_ignores_dry_run_entries() {
        let mut entries = Vec::new();
        for i in 0..4 {
            let mut e = ExecutionLogEntry::pending(
                JobId::new(),
                None,
                ExecutionAction::CopyFile,
                None,
                format!("dest-{i}"),
                i,
                0,
            );
            if i < 2 {
                e.mark_success();
            } else if i == 2 {
                e.mark_failed("io error");
            }
            entries.push(e);
        }
        // entries: success, success, failed, skipped_dry_run(default) -> rate over 3 attempted = 1/3
        assert!((failure_rate(&entries) - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn failure_rate_is_zero_with_no_attempts() {
        assert_eq!(failure_rate(&[]), 0.0);
    }
}
