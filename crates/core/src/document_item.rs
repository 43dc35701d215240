// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DocumentItem`: one per source file discovered under a job's source root
//! (spec §3).

use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Surrogate identifier for a `DocumentItem` row.
    pub struct DocumentItemId("doc-");
}

/// Lifecycle status of a `DocumentItem`. Transitions are monotonic in the
/// order below except `error`, which is terminal for that item (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Discovered,
    Processing,
    Processed,
    Organizing,
    Organized,
    PendingApply,
    Applying,
    Applied,
    Error,
    Skipped,
}

crate::simple_display! {
    DocumentStatus {
        Discovered => "discovered",
        Processing => "processing",
        Processed => "processed",
        Organizing => "organizing",
        Organized => "organized",
        PendingApply => "pending_apply",
        Applying => "applying",
        Applied => "applied",
        Error => "error",
        Skipped => "skipped",
    }
}

impl DocumentStatus {
    /// Ordinal rank for the monotonic-progress invariant (spec §8 P1).
    /// `Error`/`Skipped` are terminal off-ramps, not part of the ladder.
    pub fn rank(self) -> Option<u8> {
        match self {
            DocumentStatus::Discovered => Some(0),
            DocumentStatus::Processing => Some(1),
            DocumentStatus::Processed => Some(2),
            DocumentStatus::Organizing => Some(3),
            DocumentStatus::Organized => Some(4),
            DocumentStatus::PendingApply => Some(5),
            DocumentStatus::Applying => Some(6),
            DocumentStatus::Applied => Some(7),
            DocumentStatus::Error | DocumentStatus::Skipped => None,
        }
    }

    pub fn is_terminal_off_ramp(self) -> bool {
        matches!(self, DocumentStatus::Error | DocumentStatus::Skipped)
    }
}

/// A single discovered file and everything the pipeline has learned or
/// decided about it (spec §3 `DocumentItem`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentItem {
    pub id: DocumentItemId,
    /// Stable hash of the relative source path; identity key for idempotent re-indexing.
    pub file_id: String,
    pub job_id: JobId,

    pub current_name: String,
    pub current_path: String,
    pub extension: String,
    pub file_size: u64,
    pub mime_type: String,
    pub content_hash: Option<String>,
    pub source_mtime_ms: u64,

    pub content_summary: String,
    pub document_type: String,
    pub key_topics: Vec<String>,

    pub proposed_name: Option<String>,
    pub proposed_path: Option<String>,
    pub proposed_tags: Vec<String>,
    pub organization_reasoning: Option<String>,

    pub final_name: Option<String>,
    pub final_path: Option<String>,

    pub status: DocumentStatus,
    pub changes_applied: bool,
    pub is_deleted: bool,

    pub error_message: Option<String>,
}

impl DocumentItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new_discovered(
        job_id: JobId,
        file_id: String,
        current_name: String,
        current_path: String,
        extension: String,
        file_size: u64,
        mime_type: String,
        source_mtime_ms: u64,
    ) -> Self {
        Self {
            id: DocumentItemId::new(),
            file_id,
            job_id,
            current_name,
            current_path,
            extension,
            file_size,
            mime_type,
            content_hash: None,
            source_mtime_ms,
            content_summary: String::new(),
            document_type: String::new(),
            key_topics: Vec::new(),
            proposed_name: None,
            proposed_path: None,
            proposed_tags: Vec::new(),
            organization_reasoning: None,
            final_name: None,
            final_path: None,
            status: DocumentStatus::Discovered,
            changes_applied: false,
            is_deleted: false,
            error_message: None,
        }
    }

    /// Whether a planned rename/move is present (both set) vs. unchanged (both null) — spec §3, §4.8 rule 5.
    pub fn has_consistent_proposal(&self) -> bool {
        self.proposed_name.is_some() == self.proposed_path.is_some()
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = DocumentStatus::Error;
        self.error_message = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentItem {
        DocumentItem::new_discovered(
            JobId::new(),
            "filehash123".into(),
            "report.pdf".into(),
            "A/report.pdf".into(),
            "pdf".into(),
            1024,
            "application/pdf".into(),
            1000,
        )
    }

    #[test]
    fn new_item_starts_discovered_with_empty_summary() {
        let item = sample();
        assert_eq!(item.status, DocumentStatus::Discovered);
        assert!(item.content_hash.is_none());
        assert!(item.content_summary.is_empty());
        assert!(item.has_consistent_proposal());
    }

    #[test]
    fn inconsistent_proposal_is_detected() {
        let mut item = sample();
        item.proposed_name = Some("x.pdf".into());
        assert!(!item.has_consistent_proposal());
        item.proposed_path = Some("/docs/x.pdf".into());
        assert!(item.has_consistent_proposal());
    }

    #[test]
    fn mark_error_is_a_terminal_off_ramp() {
        let mut item = sample();
        item.mark_error("permission denied");
        assert_eq!(item.status, DocumentStatus::Error);
        assert!(item.status.is_terminal_off_ramp());
        assert_eq!(item.error_message.as_deref(), Some("permission denied"));
    }

    #[test]
    fn status_rank_is_monotonic_along_the_happy_path() {
        let ranks: Vec<u8> = [
            DocumentStatus::Discovered,
            DocumentStatus::Processing,
            DocumentStatus::Processed,
            DocumentStatus::Organizing,
            DocumentStatus::Organized,
            DocumentStatus::PendingApply,
            DocumentStatus::Applying,
            DocumentStatus::Applied,
        ]
        .into_iter()
        .map(|s| s.rank().unwrap())
        .collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }
}
