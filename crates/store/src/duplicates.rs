// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over `duplicate_groups`/`duplicate_members`
//! (spec §3, §4.6, §8 P2).

use crate::StoreError;
use arc_core::document_item::DocumentItemId;
use arc_core::duplicate::{
    validate_group_members, DecidedBy, DuplicateAction, DuplicateGroup, DuplicateGroupId, DuplicateMember,
};
use arc_core::job::JobId;
use rusqlite::{params, Connection};

fn parse_decided_by(s: &str) -> DecidedBy {
    match s {
        "llm" => DecidedBy::Llm,
        "user" => DecidedBy::User,
        _ => DecidedBy::Auto,
    }
}

fn parse_action(s: &str) -> DuplicateAction {
    match s {
        "shortcut" => DuplicateAction::Shortcut,
        "keep_both" => DuplicateAction::KeepBoth,
        "delete" => DuplicateAction::Delete,
        _ => DuplicateAction::KeepPrimary,
    }
}

/// Persist a group and its members transactionally, rejecting the write if
/// the member set breaks the exactly-one-primary invariant (spec §8 P2).
pub fn put_group(conn: &Connection, group: &DuplicateGroup, members: &[DuplicateMember]) -> Result<(), StoreError> {
    if !validate_group_members(members) {
        return Err(StoreError::Invariant(format!(
            "duplicate group {} has an invalid member set (must have exactly one primary)",
            group.id
        )));
    }
    conn.execute(
        "INSERT INTO duplicate_groups (id, job_id, content_hash, file_count, total_size, primary_document_id, decision_reasoning, decided_by)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(id) DO UPDATE SET
            file_count = excluded.file_count,
            total_size = excluded.total_size,
            primary_document_id = excluded.primary_document_id,
            decision_reasoning = excluded.decision_reasoning,
            decided_by = excluded.decided_by",
        params![
            group.id.as_str(),
            group.job_id.as_str(),
            group.content_hash,
            group.file_count as i64,
            group.total_size as i64,
            group.primary_document_id.as_str(),
            group.decision_reasoning,
            group.decided_by.to_string(),
        ],
    )?;
    for member in members {
        conn.execute(
            "INSERT INTO duplicate_members (group_id, document_id, is_primary, action, action_reasoning, shortcut_target_path)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(group_id, document_id) DO UPDATE SET
                is_primary = excluded.is_primary,
                action = excluded.action,
                action_reasoning = excluded.action_reasoning,
                shortcut_target_path = excluded.shortcut_target_path",
            params![
                member.group_id.as_str(),
                member.document_id.as_str(),
                member.is_primary as i64,
                member.action.to_string(),
                member.action_reasoning,
                member.shortcut_target_path,
            ],
        )?;
    }
    Ok(())
}

pub fn list_members(conn: &Connection, group_id: &DuplicateGroupId) -> Result<Vec<DuplicateMember>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT group_id, document_id, is_primary, action, action_reasoning, shortcut_target_path FROM duplicate_members WHERE group_id = ?1",
    )?;
    let rows = stmt.query_map(params![group_id.as_str()], |row| {
        Ok(DuplicateMember {
            group_id: DuplicateGroupId::from_string(row.get::<_, String>(0)?),
            document_id: DocumentItemId::from_string(row.get::<_, String>(1)?),
            is_primary: row.get::<_, i64>(2)? != 0,
            action: parse_action(&row.get::<_, String>(3)?),
            action_reasoning: row.get(4)?,
            shortcut_target_path: row.get(5)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

pub fn list_groups(conn: &Connection, job_id: &JobId) -> Result<Vec<DuplicateGroup>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, content_hash, file_count, total_size, primary_document_id, decision_reasoning, decided_by FROM duplicate_groups WHERE job_id = ?1",
    )?;
    let rows = stmt.query_map(params![job_id.as_str()], |row| {
        Ok(DuplicateGroup {
            id: DuplicateGroupId::from_string(row.get::<_, String>(0)?),
            job_id: JobId::from_string(row.get::<_, String>(1)?),
            content_hash: row.get(2)?,
            file_count: row.get::<_, i64>(3)? as u32,
            total_size: row.get::<_, i64>(4)? as u64,
            primary_document_id: DocumentItemId::from_string(row.get::<_, String>(5)?),
            decision_reasoning: row.get(6)?,
            decided_by: parse_decided_by(&row.get::<_, String>(7)?),
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn sample_group_and_members() -> (DuplicateGroup, Vec<DuplicateMember>) {
        let job_id = JobId::new();
        let group_id = DuplicateGroupId::new();
        let primary_doc = DocumentItemId::new();
        let group = DuplicateGroup {
            id: group_id,
            job_id,
            content_hash: "hash-1".into(),
            file_count: 2,
            total_size: 2048,
            primary_document_id: primary_doc,
            decision_reasoning: Some("identical bytes".into()),
            decided_by: DecidedBy::Auto,
        };
        let members = vec![
            DuplicateMember::primary(group_id, primary_doc),
            DuplicateMember {
                group_id,
                document_id: DocumentItemId::new(),
                is_primary: false,
                action: DuplicateAction::Shortcut,
                action_reasoning: None,
                shortcut_target_path: Some("A/report.pdf".into()),
            },
        ];
        (group, members)
    }

    #[test]
    fn put_group_persists_group_and_members() {
        let store = Store::open_in_memory().unwrap();
        let (group, members) = sample_group_and_members();
        store.with_transaction(|tx| put_group(tx, &group, &members)).unwrap();

        let fetched_members = store.with_read_only(|tx| list_members(tx, &group.id)).unwrap();
        assert_eq!(fetched_members.len(), 2);

        let groups = store.with_read_only(|tx| list_groups(tx, &group.job_id)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].content_hash, "hash-1");
    }

    #[test]
    fn put_group_rejects_invalid_member_set() {
        let store = Store::open_in_memory().unwrap();
        let (group, mut members) = sample_group_and_members();
        members[1].is_primary = true; // now two primaries
        let result = store.with_transaction(|tx| put_group(tx, &group, &members));
        assert!(result.is_err());
    }
}
