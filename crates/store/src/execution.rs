// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over `shortcuts`/`execution_log` (spec §3, §4.9).

use crate::StoreError;
use arc_core::document_item::DocumentItemId;
use arc_core::execution_log::{ExecutionAction, ExecutionLogEntry, ExecutionLogId, ExecutionOutcome};
use arc_core::job::JobId;
use arc_core::shortcut::{ShortcutId, ShortcutReason, ShortcutRecord, ShortcutType};
use rusqlite::{params, Connection};

fn parse_action(s: &str) -> ExecutionAction {
    match s {
        "create_directory" => ExecutionAction::CreateDirectory,
        "rename_file" => ExecutionAction::RenameFile,
        "move_file" => ExecutionAction::MoveFile,
        "create_shortcut" => ExecutionAction::CreateShortcut,
        "archive_version" => ExecutionAction::ArchiveVersion,
        "delete" => ExecutionAction::Delete,
        _ => ExecutionAction::CopyFile,
    }
}

fn parse_outcome(s: &str) -> ExecutionOutcome {
    match s {
        "success" => ExecutionOutcome::Success,
        "failed" => ExecutionOutcome::Failed,
        _ => ExecutionOutcome::SkippedDryRun,
    }
}

fn parse_reason(s: &str) -> ShortcutReason {
    match s {
        "superseded_version" => ShortcutReason::SupersededVersion,
        _ => ShortcutReason::DuplicateShortcut,
    }
}

pub fn put_shortcut(conn: &Connection, record: &ShortcutRecord) -> Result<(), StoreError> {
    if !record.is_valid() {
        return Err(StoreError::Invariant(format!("shortcut {} points at its own target", record.id)));
    }
    conn.execute(
        "INSERT INTO shortcuts (id, job_id, reason, shortcut_path, shortcut_type, target_document_id, target_path, original_path, original_hash, created)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
         ON CONFLICT(id) DO UPDATE SET created = excluded.created",
        params![
            record.id.as_str(),
            record.job_id.as_str(),
            record.reason.to_string(),
            record.shortcut_path,
            record.shortcut_type.to_string(),
            record.target_document_id.as_str(),
            record.target_path,
            record.original_path,
            record.original_hash,
            record.created as i64,
        ],
    )?;
    Ok(())
}

pub fn list_shortcuts(conn: &Connection, job_id: &JobId) -> Result<Vec<ShortcutRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, reason, shortcut_path, shortcut_type, target_document_id, target_path, original_path, original_hash, created FROM shortcuts WHERE job_id = ?1",
    )?;
    let rows = stmt.query_map(params![job_id.as_str()], |row| {
        Ok(ShortcutRecord {
            id: ShortcutId::from_string(row.get::<_, String>(0)?),
            job_id: JobId::from_string(row.get::<_, String>(1)?),
            reason: parse_reason(&row.get::<_, String>(2)?),
            shortcut_path: row.get(3)?,
            shortcut_type: ShortcutType::from_str(&row.get::<_, String>(4)?).unwrap_or(ShortcutType::Symlink),
            target_document_id: DocumentItemId::from_string(row.get::<_, String>(5)?),
            target_path: row.get(6)?,
            original_path: row.get(7)?,
            original_hash: row.get(8)?,
            created: row.get::<_, i64>(9)? != 0,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

/// Write an `ExecutionLogEntry` before the filesystem action runs, or update
/// it in place once the outcome is known (spec §4.9 write-ahead rule).
pub fn put_log_entry(conn: &Connection, entry: &ExecutionLogEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO execution_log (id, job_id, document_id, action, source_path, dest_path, outcome, error_message, sequence_number, recorded_at_ms)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
         ON CONFLICT(id) DO UPDATE SET
            outcome = excluded.outcome,
            error_message = excluded.error_message",
        params![
            entry.id.as_str(),
            entry.job_id.as_str(),
            entry.document_id.as_ref().map(|d| d.as_str().to_string()),
            entry.action.to_string(),
            entry.source_path,
            entry.dest_path,
            entry.outcome.to_string(),
            entry.error_message,
            entry.sequence_number as i64,
            entry.recorded_at_ms as i64,
        ],
    )?;
    Ok(())
}

pub fn list_log(conn: &Connection, job_id: &JobId) -> Result<Vec<ExecutionLogEntry>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, document_id, action, source_path, dest_path, outcome, error_message, sequence_number, recorded_at_ms FROM execution_log WHERE job_id = ?1 ORDER BY sequence_number",
    )?;
    let rows = stmt.query_map(params![job_id.as_str()], |row| {
        let document_id: Option<String> = row.get(2)?;
        Ok(ExecutionLogEntry {
            id: ExecutionLogId::from_string(row.get::<_, String>(0)?),
            job_id: JobId::from_string(row.get::<_, String>(1)?),
            document_id: document_id.map(DocumentItemId::from_string),
            action: parse_action(&row.get::<_, String>(3)?),
            source_path: row.get(4)?,
            dest_path: row.get(5)?,
            outcome: parse_outcome(&row.get::<_, String>(6)?),
            error_message: row.get(7)?,
            sequence_number: row.get::<_, i64>(8)? as u64,
            recorded_at_ms: row.get::<_, i64>(9)? as u64,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn put_shortcut_rejects_self_referential_record() {
        let store = Store::open_in_memory().unwrap();
        let record = ShortcutRecord::new(
            JobId::new(),
            ShortcutReason::DuplicateShortcut,
            "A/report.pdf".into(),
            ShortcutType::Symlink,
            DocumentItemId::new(),
            "A/report.pdf".into(),
            "A/report.pdf".into(),
            None,
        );
        let result = store.with_transaction(|tx| put_shortcut(tx, &record));
        assert!(result.is_err());
    }

    #[test]
    fn put_shortcut_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        let record = ShortcutRecord::new(
            JobId::new(),
            ShortcutReason::SupersededVersion,
            "Finance/_versions/report_v1.pdf.lnk".into(),
            ShortcutType::Url,
            DocumentItemId::new(),
            "Finance/report.pdf".into(),
            "Finance/report_v1.pdf".into(),
            Some("abc123".into()),
        );
        let job_id = record.job_id;
        store.with_transaction(|tx| put_shortcut(tx, &record)).unwrap();
        let fetched = store.with_read_only(|tx| list_shortcuts(tx, &job_id)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].reason, ShortcutReason::SupersededVersion);
        assert_eq!(fetched[0].shortcut_type, ShortcutType::Url);
        assert_eq!(fetched[0].original_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn log_entry_transitions_from_pending_to_success() {
        let store = Store::open_in_memory().unwrap();
        let job_id = JobId::new();
        let mut entry = ExecutionLogEntry::pending(
            job_id,
            Some(DocumentItemId::new()),
            ExecutionAction::CopyFile,
            Some("A/report.pdf".into()),
            "Finance/report.pdf".into(),
            0,
            1000,
        );
        store.with_transaction(|tx| put_log_entry(tx, &entry)).unwrap();
        entry.mark_success();
        store.with_transaction(|tx| put_log_entry(tx, &entry)).unwrap();

        let fetched = store.with_read_only(|tx| list_log(tx, &job_id)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].outcome, ExecutionOutcome::Success);
    }
}
