// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DuplicateGroup` / `DuplicateMember` (spec §3, §4.6).

use crate::document_item::DocumentItemId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct DuplicateGroupId("dup-");
}

/// Who decided the group's primary/action assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    Auto,
    Llm,
    User,
}

crate::simple_display! {
    DecidedBy {
        Auto => "auto",
        Llm => "llm",
        User => "user",
    }
}

/// Action assigned to one member of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    KeepPrimary,
    Shortcut,
    KeepBoth,
    Delete,
}

crate::simple_display! {
    DuplicateAction {
        KeepPrimary => "keep_primary",
        Shortcut => "shortcut",
        KeepBoth => "keep_both",
        Delete => "delete",
    }
}

/// A set of `DocumentItem`s sharing one content hash (spec §3 `DuplicateGroup`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: DuplicateGroupId,
    pub job_id: JobId,
    pub content_hash: String,
    pub file_count: u32,
    pub total_size: u64,
    pub primary_document_id: DocumentItemId,
    pub decision_reasoning: Option<String>,
    pub decided_by: DecidedBy,
}

/// One file's membership and assigned action within a `DuplicateGroup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMember {
    pub group_id: DuplicateGroupId,
    pub document_id: DocumentItemId,
    pub is_primary: bool,
    pub action: DuplicateAction,
    pub action_reasoning: Option<String>,
    pub shortcut_target_path: Option<String>,
}

impl DuplicateMember {
    pub fn primary(group_id: DuplicateGroupId, document_id: DocumentItemId) -> Self {
        Self {
            group_id,
            document_id,
            is_primary: true,
            action: DuplicateAction::KeepPrimary,
            action_reasoning: None,
            shortcut_target_path: None,
        }
    }

    /// Invariant: `action == keep_primary` iff `is_primary` (spec §3).
    pub fn is_consistent(&self) -> bool {
        self.is_primary == (self.action == DuplicateAction::KeepPrimary)
    }
}

/// Verify the group invariant: exactly one primary, and exactly one
/// member with `action = keep_primary` (spec §3, §8 P2).
pub fn validate_group_members(members: &[DuplicateMember]) -> bool {
    let primaries = members.iter().filter(|m| m.is_primary).count();
    let keep_primary_actions = members.iter().filter(|m| m.action == DuplicateAction::KeepPrimary).count();
    primaries == 1 && keep_primary_actions == 1 && members.iter().all(DuplicateMember::is_consistent)
}
