// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON shapes written by the Executor and read back by `get_report` (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestOperation {
    #[serde(rename = "type")]
    pub action: String,
    pub source: Option<String>,
    pub target: String,
    pub document_id: Option<String>,
    pub success: bool,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestShortcut {
    pub shortcut_path: String,
    pub target_path: String,
    pub original_path: String,
    pub shortcut_type: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManifestStatistics {
    pub total_files: u64,
    pub directories_created: u64,
    pub files_copied: u64,
    pub files_renamed: u64,
    pub files_moved: u64,
    pub shortcuts_created: u64,
    pub version_archives: u64,
    pub errors: u64,
}

/// The execution manifest written to `/data/reports/<job>_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionManifest {
    pub job_id: String,
    pub executed_at: u64,
    pub source_archive: String,
    pub statistics: ManifestStatistics,
    pub operations: Vec<ManifestOperation>,
    pub shortcuts: Vec<ManifestShortcut>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionManifestEntry {
    pub version: u32,
    pub file: String,
    pub date: Option<String>,
    pub status: String,
}

/// One per version chain, written alongside the archived members (spec §4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionChainManifest {
    pub document_name: String,
    pub current_version: u32,
    pub current_file: String,
    pub archive_path: Option<String>,
    pub archive_strategy: String,
    pub versions: Vec<VersionManifestEntry>,
    pub generated_at: u64,
}
