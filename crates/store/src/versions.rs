// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over `version_chains`/`version_chain_members`
//! (spec §3, §4.7, §8 P3).

use crate::StoreError;
use arc_core::config::VersionArchiveStrategy;
use arc_core::document_item::DocumentItemId;
use arc_core::job::JobId;
use arc_core::version::{
    validate_chain_members, DetectionMethod, VersionChain, VersionChainId, VersionChainMember, VersionMemberStatus,
};
use rusqlite::{params, Connection};

fn parse_detection_method(s: &str) -> DetectionMethod {
    match s {
        "name_similarity" => DetectionMethod::NameSimilarity,
        "content_similarity" => DetectionMethod::ContentSimilarity,
        _ => DetectionMethod::ExplicitMarker,
    }
}

fn parse_member_status(s: &str) -> VersionMemberStatus {
    match s {
        "active" => VersionMemberStatus::Active,
        "archived" => VersionMemberStatus::Archived,
        _ => VersionMemberStatus::Superseded,
    }
}

fn parse_archive_strategy(s: &str) -> VersionArchiveStrategy {
    match s {
        "inline" => VersionArchiveStrategy::Inline,
        "separate_archive" => VersionArchiveStrategy::SeparateArchive,
        _ => VersionArchiveStrategy::Subfolder,
    }
}

/// Persist a chain and its members transactionally, rejecting the write if
/// the member set breaks the exactly-one-current invariant (spec §8 P3).
pub fn put_chain(conn: &Connection, chain: &VersionChain, members: &[VersionChainMember]) -> Result<(), StoreError> {
    if !validate_chain_members(members) {
        return Err(StoreError::Invariant(format!(
            "version chain {} has an invalid member set (must have exactly one current version)",
            chain.id
        )));
    }
    conn.execute(
        "INSERT INTO version_chains (id, job_id, chain_name, base_path, current_document_id, current_version_number, detection_method, detection_confidence, llm_reasoning, version_order_confirmed, archive_strategy, archive_path)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
         ON CONFLICT(id) DO UPDATE SET
            current_document_id = excluded.current_document_id,
            current_version_number = excluded.current_version_number,
            llm_reasoning = excluded.llm_reasoning,
            version_order_confirmed = excluded.version_order_confirmed,
            archive_path = excluded.archive_path",
        params![
            chain.id.as_str(),
            chain.job_id.as_str(),
            chain.chain_name,
            chain.base_path,
            chain.current_document_id.as_str(),
            chain.current_version_number as i64,
            chain.detection_method.to_string(),
            chain.detection_confidence,
            chain.llm_reasoning,
            chain.version_order_confirmed as i64,
            chain.archive_strategy.to_string(),
            chain.archive_path,
        ],
    )?;
    for member in members {
        conn.execute(
            "INSERT INTO version_chain_members (chain_id, document_id, version_number, version_label, version_date, is_current, status, proposed_version_name, proposed_version_path)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(chain_id, document_id) DO UPDATE SET
                version_number = excluded.version_number,
                is_current = excluded.is_current,
                status = excluded.status,
                proposed_version_name = excluded.proposed_version_name,
                proposed_version_path = excluded.proposed_version_path",
            params![
                member.chain_id.as_str(),
                member.document_id.as_str(),
                member.version_number as i64,
                member.version_label,
                member.version_date,
                member.is_current as i64,
                member.status.to_string(),
                member.proposed_version_name,
                member.proposed_version_path,
            ],
        )?;
    }
    Ok(())
}

pub fn list_members(conn: &Connection, chain_id: &VersionChainId) -> Result<Vec<VersionChainMember>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT chain_id, document_id, version_number, version_label, version_date, is_current, status, proposed_version_name, proposed_version_path FROM version_chain_members WHERE chain_id = ?1 ORDER BY version_number",
    )?;
    let rows = stmt.query_map(params![chain_id.as_str()], |row| {
        Ok(VersionChainMember {
            chain_id: VersionChainId::from_string(row.get::<_, String>(0)?),
            document_id: DocumentItemId::from_string(row.get::<_, String>(1)?),
            version_number: row.get::<_, i64>(2)? as u32,
            version_label: row.get(3)?,
            version_date: row.get(4)?,
            is_current: row.get::<_, i64>(5)? != 0,
            status: parse_member_status(&row.get::<_, String>(6)?),
            proposed_version_name: row.get(7)?,
            proposed_version_path: row.get(8)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

pub fn list_chains(conn: &Connection, job_id: &JobId) -> Result<Vec<VersionChain>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, chain_name, base_path, current_document_id, current_version_number, detection_method, detection_confidence, llm_reasoning, version_order_confirmed, archive_strategy, archive_path FROM version_chains WHERE job_id = ?1",
    )?;
    let rows = stmt.query_map(params![job_id.as_str()], |row| {
        Ok(VersionChain {
            id: VersionChainId::from_string(row.get::<_, String>(0)?),
            job_id: JobId::from_string(row.get::<_, String>(1)?),
            chain_name: row.get(2)?,
            base_path: row.get(3)?,
            current_document_id: DocumentItemId::from_string(row.get::<_, String>(4)?),
            current_version_number: row.get::<_, i64>(5)? as u32,
            detection_method: parse_detection_method(&row.get::<_, String>(6)?),
            detection_confidence: row.get(7)?,
            llm_reasoning: row.get(8)?,
            version_order_confirmed: row.get::<_, i64>(9)? != 0,
            archive_strategy: parse_archive_strategy(&row.get::<_, String>(10)?),
            archive_path: row.get(11)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn sample_chain_and_members() -> (VersionChain, Vec<VersionChainMember>) {
        let job_id = JobId::new();
        let chain_id = VersionChainId::new();
        let current_doc = DocumentItemId::new();
        let chain = VersionChain {
            id: chain_id,
            job_id,
            chain_name: "Q1 Budget".into(),
            base_path: "Finance/budget".into(),
            current_document_id: current_doc,
            current_version_number: 2,
            detection_method: DetectionMethod::NameSimilarity,
            detection_confidence: 0.92,
            llm_reasoning: None,
            version_order_confirmed: true,
            archive_strategy: VersionArchiveStrategy::Subfolder,
            archive_path: Some("Finance/budget/_versions".into()),
        };
        let members = vec![
            VersionChainMember {
                chain_id,
                document_id: DocumentItemId::new(),
                version_number: 1,
                version_label: Some("v1".into()),
                version_date: None,
                is_current: false,
                status: VersionMemberStatus::Superseded,
                proposed_version_name: None,
                proposed_version_path: None,
            },
            VersionChainMember {
                chain_id,
                document_id: current_doc,
                version_number: 2,
                version_label: Some("v2".into()),
                version_date: None,
                is_current: true,
                status: VersionMemberStatus::Active,
                proposed_version_name: None,
                proposed_version_path: None,
            },
        ];
        (chain, members)
    }

    #[test]
    fn put_chain_persists_chain_and_members_in_order() {
        let store = Store::open_in_memory().unwrap();
        let (chain, members) = sample_chain_and_members();
        store.with_transaction(|tx| put_chain(tx, &chain, &members)).unwrap();

        let fetched = store.with_read_only(|tx| list_members(tx, &chain.id)).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].version_number, 1);
        assert_eq!(fetched[1].version_number, 2);
        assert!(fetched[1].is_current);
    }

    #[test]
    fn put_chain_rejects_two_current_members() {
        let store = Store::open_in_memory().unwrap();
        let (chain, mut members) = sample_chain_and_members();
        members[0].is_current = true;
        members[0].status = VersionMemberStatus::Active;
        let result = store.with_transaction(|tx| put_chain(tx, &chain, &members));
        assert!(result.is_err());
    }
}
