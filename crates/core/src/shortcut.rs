// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ShortcutRecord`: a placeholder left behind for a non-primary duplicate
//! or superseded version (spec §3, §4.9).

use crate::document_item::DocumentItemId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct ShortcutId("sct-");
}

/// Why a shortcut was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutReason {
    DuplicateShortcut,
    SupersededVersion,
}

crate::simple_display! {
    ShortcutReason {
        DuplicateShortcut => "duplicate_shortcut",
        SupersededVersion => "superseded_version",
    }
}

/// How a shortcut was realized on disk (spec §3 `ShortcutRecord`'s
/// `shortcut_type`). Preference order when creating one is symlink, then
/// url, then desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutType {
    Symlink,
    Url,
    Desktop,
}

crate::simple_display! {
    ShortcutType {
        Symlink => "symlink",
        Url => "url",
        Desktop => "desktop",
    }
}

impl ShortcutType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "symlink" => Some(Self::Symlink),
            "url" => Some(Self::Url),
            "desktop" => Some(Self::Desktop),
            _ => None,
        }
    }
}

/// A pointer file written at `shortcut_path` referring back to `target_document_id`
/// at `target_path` (spec §3 `ShortcutRecord`). `original_path`/`original_hash`
/// preserve where the shortcut's source document used to live and its
/// content hash, since `shortcut_path` becomes the new location of the
/// pointer file itself once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutRecord {
    pub id: ShortcutId,
    pub job_id: JobId,
    pub reason: ShortcutReason,
    pub shortcut_path: String,
    pub shortcut_type: ShortcutType,
    pub target_document_id: DocumentItemId,
    pub target_path: String,
    pub original_path: String,
    pub original_hash: Option<String>,
    pub created: bool,
}

impl ShortcutRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: JobId,
        reason: ShortcutReason,
        shortcut_path: String,
        shortcut_type: ShortcutType,
        target_document_id: DocumentItemId,
        target_path: String,
        original_path: String,
        original_hash: Option<String>,
    ) -> Self {
        Self {
            id: ShortcutId::new(),
            job_id,
            reason,
            shortcut_path,
            shortcut_type,
            target_document_id,
            target_path,
            original_path,
            original_hash,
            created: false,
        }
    }

    /// Invariant: a shortcut must never point at itself (spec §8 R2 "no file
    /// is silently dropped" applies transitively — a self-referential
    /// shortcut would hide its own target).
    pub fn is_valid(&self) -> bool {
        self.shortcut_path != self.target_path
    }
}
