// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor: materializes the plan into the working tree, creates shortcuts
//! and version archives, and writes the execution manifest (spec §4.9).
//!
//! The source tree is never touched; every mutation lands under
//! `working_root`. A non-dry run clears its working tree first.

use crate::error::EngineError;
use crate::phases::PhaseContext;
use crate::sanitize::sanitize_path;
use arc_core::config::{PipelineConfig, VersionArchiveStrategy};
use arc_core::document_item::{DocumentItem, DocumentItemId, DocumentStatus};
use arc_core::duplicate::DuplicateAction;
use arc_core::execution_log::{failure_rate, ExecutionAction, ExecutionLogEntry, ExecutionOutcome};
use arc_core::job::JobId;
use arc_core::shortcut::{ShortcutReason, ShortcutRecord, ShortcutType};
use arc_core::version::{VersionChain, VersionChainMember, VersionMemberStatus};
use arc_core::Clock;
use arc_store::document_items;
use arc_store::duplicates;
use arc_store::execution;
use arc_store::planning;
use arc_store::versions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ManifestOperation {
    #[serde(rename = "type")]
    action: String,
    source: Option<String>,
    target: String,
    document_id: Option<String>,
    success: bool,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ManifestShortcut {
    shortcut_path: String,
    target_path: String,
    original_path: String,
    shortcut_type: String,
    created_at: u64,
}

#[derive(Debug, Serialize, Default)]
struct ManifestStatistics {
    total_files: u64,
    directories_created: u64,
    files_copied: u64,
    files_renamed: u64,
    files_moved: u64,
    shortcuts_created: u64,
    version_archives: u64,
    errors: u64,
}

#[derive(Debug, Serialize)]
struct ExecutionManifest {
    job_id: String,
    executed_at: u64,
    source_archive: String,
    statistics: ManifestStatistics,
    operations: Vec<ManifestOperation>,
    shortcuts: Vec<ManifestShortcut>,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VersionManifestEntry {
    version: u32,
    file: String,
    date: Option<String>,
    status: String,
}

#[derive(Debug, Serialize)]
struct VersionChainManifest {
    document_name: String,
    current_version: u32,
    current_file: String,
    archive_path: Option<String>,
    archive_strategy: String,
    versions: Vec<VersionManifestEntry>,
    generated_at: u64,
}

#[derive(Debug, Deserialize)]
struct RollbackManifest {
    job_id: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutorOutcome {
    pub directories_created: u64,
    pub files_copied: u64,
    pub shortcuts_created: u64,
    pub version_archives: u64,
    pub errors: u64,
}

/// Run the Executor for `job_id`. `reports_root` is where the execution
/// manifest is written; `source_archive` is the identity string recorded in
/// the manifest (spec §6).
#[allow(clippy::too_many_arguments)]
pub async fn run<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: JobId,
    source_root: &Path,
    working_root: &Path,
    reports_root: &Path,
    source_archive: &str,
    config: &PipelineConfig,
) -> Result<ExecutorOutcome, EngineError> {
    let now = ctx.clock.epoch_ms();
    let mut operations = Vec::new();
    let mut errors = Vec::new();
    let mut log_entries = Vec::new();
    let mut sequence: u64 = 0;
    let mut stats = ManifestStatistics::default();

    let planning_items = ctx.store.with_read_only(|tx| document_items::list_by_job(tx, &job_id))?;
    let directories = ctx.store.with_read_only(|tx| planning::list_directories(tx, &job_id.as_str().to_string()))?;
    let duplicate_groups = ctx.store.with_read_only(|tx| duplicates::list_groups(tx, &job_id))?;
    let chains = ctx.store.with_read_only(|tx| versions::list_chains(tx, &job_id))?;

    let organized: Vec<&DocumentItem> =
        planning_items.iter().filter(|i| i.status == DocumentStatus::Organized).collect();
    stats.total_files = planning_items.len() as u64;

    // Step 1: validate every assignment resolves and no two targets collide.
    let assignments = validate_plan(source_root, &organized)?;

    if config.dry_run {
        for (item, target) in &assignments {
            operations.push(ManifestOperation {
                action: "copy_file".into(),
                source: Some(item.current_path.clone()),
                target: target.clone(),
                document_id: Some(item.id.as_str().to_string()),
                success: true,
                timestamp: now,
                error: None,
            });
        }
        stats.files_copied = assignments.len() as u64;
        let manifest = ExecutionManifest {
            job_id: job_id.as_str().to_string(),
            executed_at: now,
            source_archive: source_archive.to_string(),
            statistics: stats,
            operations,
            shortcuts: Vec::new(),
            errors,
        };
        write_manifest(reports_root, &job_id, &manifest)?;
        return Ok(ExecutorOutcome { files_copied: manifest.statistics.files_copied, ..Default::default() });
    }

    clear_working_tree(working_root)?;
    let mut aborted = false;

    // Step 2: create directories, shallowest first.
    let mut sorted_dirs = directories.clone();
    sorted_dirs.sort_by_key(|d| d.depth);
    for dir in &sorted_dirs {
        if aborted {
            break;
        }
        sequence += 1;
        let target = working_root.join(sanitize_path(dir.path.trim_start_matches('/')));
        let mut entry = ExecutionLogEntry::pending(
            job_id, None, ExecutionAction::CreateDirectory, None, dir.path.clone(), sequence, now,
        );
        match create_directory(&target) {
            Ok(()) => {
                entry.mark_success();
                stats.directories_created += 1;
                operations.push(op_ok("create_directory", None, &dir.path, None, now));
            }
            Err(error) => {
                entry.mark_failed(error.to_string());
                stats.errors += 1;
                operations.push(op_err("create_directory", None, &dir.path, None, now, &error.to_string()));
                errors.push(format!("create_directory {}: {error}", dir.path));
            }
        }
        log_entries.push(entry);
        aborted = failure_rate(&log_entries) > config.executor_failure_threshold;
    }

    // Step 3: copy files in target-path order.
    let mut by_id: HashMap<DocumentItemId, DocumentItem> =
        planning_items.into_iter().map(|i| (i.id, i)).collect();

    let mut ordered_assignments = assignments;
    ordered_assignments.sort_by(|a, b| a.1.cmp(&b.1));
    for (item, target_rel) in &ordered_assignments {
        if aborted {
            break;
        }
        sequence += 1;
        let source_path = source_root.join(&item.current_path);
        let target_path = working_root.join(target_rel);
        let mut entry = ExecutionLogEntry::pending(
            job_id,
            Some(item.id),
            ExecutionAction::CopyFile,
            Some(item.current_path.clone()),
            target_rel.clone(),
            sequence,
            now,
        );
        match copy_preserving_metadata(&source_path, &target_path) {
            Ok(()) => {
                entry.mark_success();
                stats.files_copied += 1;
                operations.push(op_ok("copy_file", Some(&item.current_path), target_rel, Some(&item.id), now));
                if let Some(doc) = by_id.get_mut(&item.id) {
                    let (final_name, final_path) = split_target(target_rel);
                    doc.final_name = Some(final_name);
                    doc.final_path = Some(final_path);
                    doc.changes_applied = true;
                    doc.status = DocumentStatus::Applied;
                }
            }
            Err(error) => {
                entry.mark_failed(error.to_string());
                stats.errors += 1;
                operations.push(op_err("copy_file", Some(&item.current_path), target_rel, Some(&item.id), now, &error.to_string()));
                errors.push(format!("copy_file {}: {error}", item.current_path));
                if let Some(doc) = by_id.get_mut(&item.id) {
                    doc.mark_error(error.to_string());
                }
            }
        }
        log_entries.push(entry);
        aborted = failure_rate(&log_entries) > config.executor_failure_threshold;
    }

    // Step 4: shortcuts for every non-primary duplicate member.
    let mut shortcut_manifest = Vec::new();
    for group in &duplicate_groups {
        if aborted {
            break;
        }
        let members = ctx.store.with_read_only(|tx| duplicates::list_members(tx, &group.id))?;
        let Some(primary_target) = by_id.get(&group.primary_document_id).and_then(|d| d.final_path.as_ref()) else {
            continue;
        };
        let primary_target = primary_target.clone();
        for member in members.iter().filter(|m| m.action == DuplicateAction::Shortcut) {
            if aborted {
                break;
            }
            sequence += 1;
            let Some(original_item) = by_id.get(&member.document_id).cloned() else { continue };
            let original_path = original_item.current_path.clone();
            let shortcut_rel = sanitize_path(&original_path);
            let target_abs = working_root.join(&primary_target);
            let shortcut_abs = working_root.join(&shortcut_rel);
            let mut entry = ExecutionLogEntry::pending(
                job_id,
                Some(member.document_id),
                ExecutionAction::CreateShortcut,
                Some(original_path.clone()),
                shortcut_rel.clone(),
                sequence,
                now,
            );
            match create_shortcut(&target_abs, &shortcut_abs) {
                Ok(shortcut_type) => {
                    entry.mark_success();
                    stats.shortcuts_created += 1;
                    let mut record = ShortcutRecord::new(
                        job_id,
                        ShortcutReason::DuplicateShortcut,
                        shortcut_rel.clone(),
                        ShortcutType::from_str(shortcut_type).unwrap_or(ShortcutType::Symlink),
                        group.primary_document_id,
                        primary_target.clone(),
                        original_path.clone(),
                        original_item.content_hash.clone(),
                    );
                    record.created = true;
                    ctx.store.with_transaction(|tx| execution::put_shortcut(tx, &record))?;
                    shortcut_manifest.push(ManifestShortcut {
                        shortcut_path: shortcut_rel.clone(),
                        target_path: primary_target.clone(),
                        original_path: original_path.clone(),
                        shortcut_type: shortcut_type.to_string(),
                        created_at: now,
                    });
                    operations.push(op_ok("create_shortcut", Some(&original_path), &shortcut_rel, Some(&member.document_id), now));
                    if let Some(doc) = by_id.get_mut(&member.document_id) {
                        doc.final_name = doc.current_name.clone().into();
                        doc.final_path = Some(shortcut_rel.clone());
                        doc.status = DocumentStatus::Applied;
                        doc.changes_applied = true;
                    }
                }
                Err(error) => {
                    entry.mark_failed(error.to_string());
                    stats.errors += 1;
                    operations.push(op_err("create_shortcut", Some(&original_path), &shortcut_rel, Some(&member.document_id), now, &error.to_string()));
                    errors.push(format!("create_shortcut {original_path}: {error}"));
                    if let Some(doc) = by_id.get_mut(&member.document_id) {
                        doc.mark_error(error.to_string());
                    }
                }
            }
            log_entries.push(entry);
            aborted = failure_rate(&log_entries) > config.executor_failure_threshold;
        }
    }

    // Step 5: archive superseded version-chain members.
    for chain in &chains {
        if aborted {
            break;
        }
        let members = ctx.store.with_read_only(|tx| versions::list_members(tx, &chain.id))?;
        match archive_chain(ctx, &job_id, source_root, working_root, chain, &members, &mut by_id, now, &mut sequence) {
            Ok((archived_count, mut chain_log, manifest_written)) => {
                stats.version_archives += archived_count;
                log_entries.append(&mut chain_log);
                if manifest_written {
                    operations.push(op_ok(
                        "archive_version",
                        None,
                        chain.archive_path.as_deref().unwrap_or(&chain.base_path),
                        None,
                        now,
                    ));
                }
            }
            Err(error) => {
                stats.errors += 1;
                errors.push(format!("archive chain {}: {error}", chain.chain_name));
            }
        }
        aborted = failure_rate(&log_entries) > config.executor_failure_threshold;
    }

    ctx.store.with_transaction(|tx| {
        for entry in &log_entries {
            execution::put_log_entry(tx, entry)?;
        }
        for doc in by_id.values() {
            document_items::upsert(tx, doc)?;
        }
        Ok(())
    })?;

    let manifest = ExecutionManifest {
        job_id: job_id.as_str().to_string(),
        executed_at: now,
        source_archive: source_archive.to_string(),
        statistics: stats,
        operations,
        shortcuts: shortcut_manifest,
        errors: errors.clone(),
    };
    write_manifest(reports_root, &job_id, &manifest)?;

    if aborted {
        return Err(EngineError::Fatal {
            message: format!(
                "executor aborted: failure rate {:.2} exceeded threshold {:.2} ({} errors of {} operations)",
                failure_rate(&log_entries),
                config.executor_failure_threshold,
                manifest.statistics.errors,
                log_entries.len(),
            ),
        });
    }

    Ok(ExecutorOutcome {
        directories_created: manifest.statistics.directories_created,
        files_copied: manifest.statistics.files_copied,
        shortcuts_created: manifest.statistics.shortcuts_created,
        version_archives: manifest.statistics.version_archives,
        errors: manifest.statistics.errors,
    })
}

fn op_ok(action: &str, source: Option<&str>, target: &str, document_id: Option<&DocumentItemId>, now: u64) -> ManifestOperation {
    ManifestOperation {
        action: action.to_string(),
        source: source.map(str::to_string),
        target: target.to_string(),
        document_id: document_id.map(|d| d.as_str().to_string()),
        success: true,
        timestamp: now,
        error: None,
    }
}

fn op_err(
    action: &str,
    source: Option<&str>,
    target: &str,
    document_id: Option<&DocumentItemId>,
    now: u64,
    message: &str,
) -> ManifestOperation {
    ManifestOperation {
        action: action.to_string(),
        source: source.map(str::to_string),
        target: target.to_string(),
        document_id: document_id.map(|d| d.as_str().to_string()),
        success: false,
        timestamp: now,
        error: Some(message.to_string()),
    }
}

/// Validate step 1: every source exists and no two targets collide (spec §4.9).
fn validate_plan(source_root: &Path, items: &[&DocumentItem]) -> Result<Vec<(DocumentItem, String)>, EngineError> {
    let mut assignments = Vec::with_capacity(items.len());
    let mut seen_targets: HashMap<String, DocumentItemId> = HashMap::new();
    for item in items {
        let source_path = source_root.join(&item.current_path);
        if !source_path.is_file() {
            return Err(EngineError::Validation {
                message: format!("planned source file missing: {}", item.current_path),
            });
        }
        let target = match (&item.proposed_name, &item.proposed_path) {
            (Some(name), Some(path)) => {
                let dir = sanitize_path(path.trim_start_matches('/'));
                let name = sanitize_path(name);
                if dir.is_empty() {
                    name
                } else {
                    format!("{dir}/{name}")
                }
            }
            _ => sanitize_path(&item.current_path),
        };
        if let Some(existing) = seen_targets.insert(target.clone(), item.id) {
            if existing != item.id {
                return Err(EngineError::Conflict {
                    message: format!("two planned items target {target}"),
                });
            }
        }
        assignments.push(((*item).clone(), target));
    }
    Ok(assignments)
}

/// Split a full relative target path into `(final_name, final_path)`
/// mirroring the `current_name`/`current_path` convention: `final_path` is
/// the whole relative path, `final_name` just the last component.
fn split_target(target_rel: &str) -> (String, String) {
    let name = target_rel.rsplit('/').next().unwrap_or(target_rel).to_string();
    (name, target_rel.to_string())
}

fn clear_working_tree(working_root: &Path) -> Result<(), EngineError> {
    if working_root.exists() {
        std::fs::remove_dir_all(working_root).map_err(|e| EngineError::io(working_root, e))?;
    }
    std::fs::create_dir_all(working_root).map_err(|e| EngineError::io(working_root, e))?;
    Ok(())
}

fn create_directory(target: &Path) -> Result<(), EngineError> {
    if target.is_file() {
        return Err(EngineError::io(
            target,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target path is an existing file"),
        ));
    }
    std::fs::create_dir_all(target).map_err(|e| EngineError::io(target, e))
}

/// Copy `source` to `target`, preserving mtime and permissions where the
/// platform allows it (spec §4.9 step 3).
fn copy_preserving_metadata(source: &Path, target: &Path) -> Result<(), EngineError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    std::fs::copy(source, target).map_err(|e| EngineError::io(source, e))?;
    let metadata = std::fs::metadata(source).map_err(|e| EngineError::io(source, e))?;
    if let Ok(modified) = metadata.modified() {
        if let Ok(file) = std::fs::OpenOptions::new().write(true).open(target) {
            let _ = file.set_modified(modified);
        }
    }
    std::fs::set_permissions(target, metadata.permissions()).map_err(|e| EngineError::io(target, e))?;
    Ok(())
}

/// Create a cross-platform shortcut, preferring a native symlink and
/// falling back to an internet-shortcut text file (spec §4.9 step 4, §6).
fn create_shortcut(target_abs: &Path, shortcut_abs: &Path) -> Result<&'static str, EngineError> {
    if let Some(parent) = shortcut_abs.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    #[cfg(unix)]
    {
        if std::os::unix::fs::symlink(target_abs, shortcut_abs).is_ok() {
            return Ok("symlink");
        }
    }
    let body = format!("[InternetShortcut]\nURL=file://{}\n", target_abs.display());
    let url_path = shortcut_abs.with_extension(append_ext(shortcut_abs, "url"));
    std::fs::write(&url_path, body).map_err(|e| EngineError::io(&url_path, e))?;
    Ok("url")
}

fn append_ext(path: &Path, ext: &str) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(existing) => format!("{existing}.{ext}"),
        None => ext.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn archive_chain<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: &JobId,
    source_root: &Path,
    working_root: &Path,
    chain: &VersionChain,
    members: &[VersionChainMember],
    by_id: &mut HashMap<DocumentItemId, DocumentItem>,
    now: u64,
    sequence: &mut u64,
) -> Result<(u64, Vec<ExecutionLogEntry>, bool), EngineError> {
    let mut log_entries = Vec::new();
    let mut archived = 0u64;
    let mut manifest_versions = Vec::new();

    for member in members {
        let Some(doc) = by_id.get(&member.document_id).cloned() else { continue };
        if member.status == VersionMemberStatus::Superseded || member.status == VersionMemberStatus::Archived {
            *sequence += 1;
            let dest_rel = member
                .proposed_version_path
                .clone()
                .unwrap_or_else(|| format!("{}/{}", chain.base_path, doc.current_name));
            let dest_rel = sanitize_path(&dest_rel);
            let source_path = source_root.join(&doc.current_path);
            let dest_path = working_root.join(&dest_rel);
            let mut entry = ExecutionLogEntry::pending(
                *job_id,
                Some(doc.id),
                ExecutionAction::ArchiveVersion,
                Some(doc.current_path.clone()),
                dest_rel.clone(),
                *sequence,
                now,
            );
            match copy_preserving_metadata(&source_path, &dest_path) {
                Ok(()) => {
                    entry.mark_success();
                    archived += 1;
                    if let Some(d) = by_id.get_mut(&member.document_id) {
                        let (final_name, final_path) = split_target(&dest_rel);
                        d.final_name = Some(final_name);
                        d.final_path = Some(final_path);
                        d.status = DocumentStatus::Applied;
                        d.changes_applied = true;
                    }
                }
                Err(error) => {
                    entry.mark_failed(error.to_string());
                    if let Some(d) = by_id.get_mut(&member.document_id) {
                        d.mark_error(error.to_string());
                    }
                }
            }
            log_entries.push(entry);
        }
        manifest_versions.push(VersionManifestEntry {
            version: member.version_number,
            file: member.proposed_version_name.clone().unwrap_or_else(|| doc.current_name.clone()),
            date: member.version_date.clone(),
            status: member.status.to_string(),
        });
    }

    let current_doc = by_id.get(&chain.current_document_id).cloned();
    let current_file = current_doc
        .as_ref()
        .and_then(|d| d.final_path.as_ref())
        .cloned()
        .unwrap_or_else(|| format!("{}/{}", chain.base_path, chain.chain_name));

    if let Some(archive_dir) = &chain.archive_path {
        let manifest = VersionChainManifest {
            document_name: chain.chain_name.clone(),
            current_version: chain.current_version_number,
            current_file,
            archive_path: chain.archive_path.clone(),
            archive_strategy: archive_strategy_label(chain.archive_strategy),
            versions: manifest_versions,
            generated_at: now,
        };
        let archive_abs = working_root.join(sanitize_path(archive_dir.trim_start_matches('/')));
        std::fs::create_dir_all(&archive_abs).map_err(|e| EngineError::io(&archive_abs, e))?;
        let manifest_path = archive_abs.join("version_history.json");
        let body = serde_json::to_string_pretty(&manifest).map_err(|e| EngineError::Fatal { message: e.to_string() })?;
        std::fs::write(&manifest_path, body).map_err(|e| EngineError::io(&manifest_path, e))?;
        return Ok((archived, log_entries, true));
    }

    Ok((archived, log_entries, false))
}

fn archive_strategy_label(strategy: VersionArchiveStrategy) -> String {
    match strategy {
        VersionArchiveStrategy::Subfolder => "subfolder".to_string(),
        VersionArchiveStrategy::Inline => "inline".to_string(),
        VersionArchiveStrategy::SeparateArchive => "separate_archive".to_string(),
    }
}

fn write_manifest(reports_root: &Path, job_id: &JobId, manifest: &ExecutionManifest) -> Result<(), EngineError> {
    std::fs::create_dir_all(reports_root).map_err(|e| EngineError::io(reports_root, e))?;
    let path = reports_root.join(format!("{}_manifest.json", job_id.as_str()));
    let body = serde_json::to_string_pretty(manifest).map_err(|e| EngineError::Fatal { message: e.to_string() })?;
    std::fs::write(&path, body).map_err(|e| EngineError::io(&path, e))
}

/// Idempotent rollback: discard the working tree and reset plan rows to
/// `organized` (spec §4.9 "Rollback"). The source tree is never touched, so
/// no inverse operations need to be journaled.
pub fn rollback<C: Clock>(ctx: &PhaseContext<C>, manifest_path: &Path, working_root: &Path) -> Result<(), EngineError> {
    let body = std::fs::read_to_string(manifest_path).map_err(|e| EngineError::io(manifest_path, e))?;
    let manifest: RollbackManifest =
        serde_json::from_str(&body).map_err(|e| EngineError::Validation { message: e.to_string() })?;
    let job_id = JobId::from_string(manifest.job_id);

    if working_root.exists() {
        std::fs::remove_dir_all(working_root).map_err(|e| EngineError::io(working_root, e))?;
    }

    let items = ctx.store.with_read_only(|tx| document_items::list_by_job(tx, &job_id))?;
    ctx.store.with_transaction(|tx| {
        for mut item in items {
            if item.status == DocumentStatus::Applied {
                item.status = DocumentStatus::Organized;
                item.final_name = None;
                item.final_path = None;
                item.changes_applied = false;
                document_items::upsert(tx, &item)?;
            }
        }
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::duplicate::{DecidedBy, DuplicateGroup, DuplicateGroupId, DuplicateMember};
    use arc_core::job::{Job, JobId};
    use arc_core::planning::DirectoryStructureEntry;
    use arc_core::FakeClock;
    use arc_store::jobs;
    use arc_store::Store;
    use std::sync::Arc;

    fn make_tree() -> (tempfile::TempDir, tempfile::TempDir, tempfile::TempDir) {
        (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap())
    }

    #[tokio::test]
    async fn copies_organized_items_and_marks_applied() {
        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();

        let mut item = DocumentItem::new_discovered(
            job_id, "f1".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 5, "text/plain".into(), 0,
        );
        item.status = DocumentStatus::Organized;
        item.proposed_name = Some("a.txt".into());
        item.proposed_path = Some("/Docs".into());
        store.with_transaction(|tx| document_items::upsert(tx, &item)).unwrap();
        store
            .with_transaction(|tx| {
                planning::put_directory(
                    tx,
                    &DirectoryStructureEntry {
                        planning_batch_id: job_id.as_str().to_string(),
                        path: "/Docs".into(),
                        folder_name: "Docs".into(),
                        parent_path: None,
                        depth: 1,
                        purpose: "".into(),
                        expected_tags: vec![],
                        expected_document_types: vec![],
                    },
                )
            })
            .unwrap();

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        let outcome =
            run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await.unwrap();

        assert_eq!(outcome.files_copied, 1);
        assert!(working.path().join("Docs/a.txt").is_file());
        let manifest_path = reports.path().join(format!("{}_manifest.json", job_id.as_str()));
        assert!(manifest_path.is_file());

        let items = store.with_read_only(|tx| document_items::list_by_job(tx, &job_id)).unwrap();
        assert_eq!(items[0].status, DocumentStatus::Applied);
        assert_eq!(items[0].final_path.as_deref(), Some("Docs/a.txt"));
        assert_eq!(items[0].final_name.as_deref(), Some("a.txt"));
    }

    #[tokio::test]
    async fn dry_run_produces_manifest_without_filesystem_mutation() {
        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();
        let mut item = DocumentItem::new_discovered(
            job_id, "f1".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 5, "text/plain".into(), 0,
        );
        item.status = DocumentStatus::Organized;
        store.with_transaction(|tx| document_items::upsert(tx, &item)).unwrap();

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let mut config = PipelineConfig::default();
        config.dry_run = true;
        let outcome =
            run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await.unwrap();

        assert_eq!(outcome.files_copied, 1);
        assert!(!working.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn shortcut_is_created_for_non_primary_duplicate() {
        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"same").unwrap();
        std::fs::write(source.path().join("b.txt"), b"same").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();

        let mut primary = DocumentItem::new_discovered(
            job_id, "fa".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 4, "text/plain".into(), 0,
        );
        primary.status = DocumentStatus::Organized;
        primary.content_hash = Some("hash-1".into());
        let mut secondary = DocumentItem::new_discovered(
            job_id, "fb".into(), "b.txt".into(), "b.txt".into(), "txt".into(), 4, "text/plain".into(), 0,
        );
        secondary.content_hash = Some("hash-1".into());
        store.with_transaction(|tx| document_items::upsert(tx, &primary)).unwrap();
        store.with_transaction(|tx| document_items::upsert(tx, &secondary)).unwrap();

        let group_id = DuplicateGroupId::new();
        let group = DuplicateGroup {
            id: group_id,
            job_id,
            content_hash: "hash-1".into(),
            file_count: 2,
            total_size: 8,
            primary_document_id: primary.id,
            decision_reasoning: None,
            decided_by: DecidedBy::Auto,
        };
        let members = vec![
            DuplicateMember::primary(group_id, primary.id),
            DuplicateMember {
                group_id,
                document_id: secondary.id,
                is_primary: false,
                action: DuplicateAction::Shortcut,
                action_reasoning: None,
                shortcut_target_path: Some("a.txt".into()),
            },
        ];
        store.with_transaction(|tx| duplicates::put_group(tx, &group, &members)).unwrap();

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        let outcome =
            run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await.unwrap();

        assert_eq!(outcome.shortcuts_created, 1);
        assert!(working.path().join("a.txt").is_file());
        assert!(working.path().join("b.txt").exists() || working.path().join("b.txt").symlink_metadata().is_ok());
    }

    #[tokio::test]
    async fn rollback_resets_applied_items_and_clears_working_tree() {
        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();
        let mut item = DocumentItem::new_discovered(
            job_id, "f1".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 5, "text/plain".into(), 0,
        );
        item.status = DocumentStatus::Organized;
        store.with_transaction(|tx| document_items::upsert(tx, &item)).unwrap();

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await.unwrap();

        let manifest_path = reports.path().join(format!("{}_manifest.json", job_id.as_str()));
        rollback(&ctx, &manifest_path, working.path()).unwrap();

        assert!(!working.path().exists());
        let items = store.with_read_only(|tx| document_items::list_by_job(tx, &job_id)).unwrap();
        assert_eq!(items[0].status, DocumentStatus::Organized);
    }

    #[tokio::test]
    async fn failure_threshold_aborts_remaining_operations() {
        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"a").unwrap();
        std::fs::write(source.path().join("b.txt"), b"b").unwrap();
        std::fs::write(source.path().join("c.txt"), b"c").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();

        // item_a's target ("Shared/conflict") collides with item_b's target
        // directory ("Shared/conflict/file.txt"), so copying b fails once a
        // has already landed as a plain file where b needs a directory.
        let mut item_a = DocumentItem::new_discovered(
            job_id, "fa".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 1, "text/plain".into(), 0,
        );
        item_a.status = DocumentStatus::Organized;
        item_a.proposed_path = Some("/Shared".into());
        item_a.proposed_name = Some("conflict".into());

        let mut item_b = DocumentItem::new_discovered(
            job_id, "fb".into(), "b.txt".into(), "b.txt".into(), "txt".into(), 1, "text/plain".into(), 0,
        );
        item_b.status = DocumentStatus::Organized;
        item_b.proposed_path = Some("/Shared/conflict".into());
        item_b.proposed_name = Some("file.txt".into());

        let mut item_c = DocumentItem::new_discovered(
            job_id, "fc".into(), "c.txt".into(), "c.txt".into(), "txt".into(), 1, "text/plain".into(), 0,
        );
        item_c.status = DocumentStatus::Organized;
        item_c.proposed_path = Some("/Zether".into());
        item_c.proposed_name = Some("thing.txt".into());

        for item in [&item_a, &item_b, &item_c] {
            store.with_transaction(|tx| document_items::upsert(tx, item)).unwrap();
        }

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let mut config = PipelineConfig::default();
        config.executor_failure_threshold = 0.3;
        let result = run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await;

        assert!(result.is_err());
        assert!(working.path().join("Shared/conflict").is_file());
        assert!(!working.path().join("Shared/conflict/file.txt").exists());
        assert!(!working.path().join("Zether/thing.txt").exists());

        let items = store.with_read_only(|tx| document_items::list_by_job(tx, &job_id)).unwrap();
        let by_id: HashMap<_, _> = items.into_iter().map(|i| (i.id, i)).collect();
        assert_eq!(by_id[&item_a.id].status, DocumentStatus::Applied);
        assert_eq!(by_id[&item_b.id].status, DocumentStatus::Error);
        assert_eq!(by_id[&item_c.id].status, DocumentStatus::Organized);

        let manifest_path = reports.path().join(format!("{}_manifest.json", job_id.as_str()));
        assert!(manifest_path.is_file());
    }

    #[tokio::test]
    async fn superseded_version_is_archived_with_chain_manifest() {
        use arc_core::version::{DetectionMethod, VersionChain, VersionChainId, VersionChainMember, VersionMemberStatus};
        use arc_store::versions;

        let (source, working, reports) = make_tree();
        std::fs::write(source.path().join("budget_v1.xlsx"), b"v1").unwrap();
        std::fs::write(source.path().join("budget_v2.xlsx"), b"v2").unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(source.path().to_path_buf(), working.path().to_path_buf(), false, 0);
        let job_id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();

        let mut old = DocumentItem::new_discovered(
            job_id, "fv1".into(), "budget_v1.xlsx".into(), "budget_v1.xlsx".into(), "xlsx".into(), 2,
            "application/vnd.ms-excel".into(), 0,
        );
        let mut current = DocumentItem::new_discovered(
            job_id, "fv2".into(), "budget_v2.xlsx".into(), "budget_v2.xlsx".into(), "xlsx".into(), 2,
            "application/vnd.ms-excel".into(), 0,
        );
        current.status = DocumentStatus::Organized;
        current.proposed_name = Some("budget.xlsx".into());
        current.proposed_path = Some("/plans".into());
        store.with_transaction(|tx| document_items::upsert(tx, &old)).unwrap();
        store.with_transaction(|tx| document_items::upsert(tx, &current)).unwrap();

        let chain_id = VersionChainId::new();
        let chain = VersionChain {
            id: chain_id,
            job_id,
            chain_name: "budget".into(),
            base_path: "/plans".into(),
            current_document_id: current.id,
            current_version_number: 2,
            detection_method: DetectionMethod::ExplicitMarker,
            detection_confidence: 0.95,
            llm_reasoning: None,
            version_order_confirmed: true,
            archive_strategy: arc_core::VersionArchiveStrategy::Subfolder,
            archive_path: Some("/plans/_versions/budget".into()),
        };
        let members = vec![
            VersionChainMember {
                chain_id,
                document_id: old.id,
                version_number: 1,
                version_label: Some("v1".into()),
                version_date: None,
                is_current: false,
                status: VersionMemberStatus::Superseded,
                proposed_version_name: Some("budget_v1_2026.xlsx".into()),
                proposed_version_path: Some("plans/_versions/budget/budget_v1_2026.xlsx".into()),
            },
            VersionChainMember {
                chain_id,
                document_id: current.id,
                version_number: 2,
                version_label: Some("v2".into()),
                version_date: None,
                is_current: true,
                status: VersionMemberStatus::Active,
                proposed_version_name: None,
                proposed_version_path: None,
            },
        ];
        store.with_transaction(|tx| versions::put_chain(tx, &chain, &members)).unwrap();

        let ctx = PhaseContext::new(store.clone(), FakeClock::new(), tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        let outcome =
            run(&ctx, job_id, source.path(), working.path(), reports.path(), "a.zip", &config).await.unwrap();

        assert_eq!(outcome.version_archives, 1);
        assert!(working.path().join("plans/_versions/budget/budget_v1_2026.xlsx").is_file());
        assert!(working.path().join("plans/_versions/budget/version_history.json").is_file());
        assert!(working.path().join("plans/budget.xlsx").is_file());

        let fetched_old = store
            .with_read_only(|tx| document_items::get(tx, &old.id))
            .unwrap()
            .unwrap();
        assert_eq!(fetched_old.status, DocumentStatus::Applied);
        assert_eq!(fetched_old.final_path.as_deref(), Some("plans/_versions/budget/budget_v1_2026.xlsx"));
    }

    #[test]
    fn validate_plan_never_produces_a_leading_slash_target() {
        let (source, _working, _reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();

        let mut item = DocumentItem::new_discovered(
            JobId::new(), "f1".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 5, "text/plain".into(), 0,
        );
        item.proposed_name = Some("a.txt".into());
        item.proposed_path = Some("".into());

        let items = vec![&item];
        let assignments = validate_plan(source.path(), &items).unwrap();

        assert_eq!(assignments.len(), 1);
        let (_, target) = &assignments[0];
        assert_eq!(target, "a.txt");
        assert!(!target.starts_with('/'), "target must be relative to working_root: {target}");
    }

    #[test]
    fn validate_plan_strips_leading_slash_from_a_root_proposed_path() {
        let (source, _working, _reports) = make_tree();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();

        let mut item = DocumentItem::new_discovered(
            JobId::new(), "f1".into(), "a.txt".into(), "a.txt".into(), "txt".into(), 5, "text/plain".into(), 0,
        );
        item.proposed_name = Some("a.txt".into());
        item.proposed_path = Some("/".into());

        let items = vec![&item];
        let assignments = validate_plan(source.path(), &items).unwrap();

        assert_eq!(assignments[0].1, "a.txt");
    }
}
