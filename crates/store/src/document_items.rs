// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over the `document_items` table (spec §3 `DocumentItem`).

use crate::StoreError;
use arc_core::document_item::{DocumentItem, DocumentItemId, DocumentStatus};
use arc_core::job::JobId;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<DocumentItem> {
    let key_topics_json: String = row.get("key_topics_json")?;
    let proposed_tags_json: String = row.get("proposed_tags_json")?;
    Ok(DocumentItem {
        id: DocumentItemId::from_string(row.get::<_, String>("id")?),
        file_id: row.get("file_id")?,
        job_id: JobId::from_string(row.get::<_, String>("job_id")?),
        current_name: row.get("current_name")?,
        current_path: row.get("current_path")?,
        extension: row.get("extension")?,
        file_size: row.get::<_, i64>("file_size")? as u64,
        mime_type: row.get("mime_type")?,
        content_hash: row.get("content_hash")?,
        source_mtime_ms: row.get::<_, i64>("source_mtime_ms")? as u64,
        content_summary: row.get("content_summary")?,
        document_type: row.get("document_type")?,
        key_topics: serde_json::from_str(&key_topics_json).unwrap_or_default(),
        proposed_name: row.get("proposed_name")?,
        proposed_path: row.get("proposed_path")?,
        proposed_tags: serde_json::from_str(&proposed_tags_json).unwrap_or_default(),
        organization_reasoning: row.get("organization_reasoning")?,
        final_name: row.get("final_name")?,
        final_path: row.get("final_path")?,
        status: parse_status(&row.get::<_, String>("status")?),
        changes_applied: row.get::<_, i64>("changes_applied")? != 0,
        is_deleted: row.get::<_, i64>("is_deleted")? != 0,
        error_message: row.get("error_message")?,
    })
}

fn parse_status(s: &str) -> DocumentStatus {
    match s {
        "discovered" => DocumentStatus::Discovered,
        "processing" => DocumentStatus::Processing,
        "processed" => DocumentStatus::Processed,
        "organizing" => DocumentStatus::Organizing,
        "organized" => DocumentStatus::Organized,
        "pending_apply" => DocumentStatus::PendingApply,
        "applying" => DocumentStatus::Applying,
        "applied" => DocumentStatus::Applied,
        "skipped" => DocumentStatus::Skipped,
        _ => DocumentStatus::Error,
    }
}

pub fn upsert(conn: &Connection, item: &DocumentItem) -> Result<(), StoreError> {
    let key_topics_json = serde_json::to_string(&item.key_topics).unwrap_or_else(|_| "[]".into());
    let proposed_tags_json = serde_json::to_string(&item.proposed_tags).unwrap_or_else(|_| "[]".into());
    conn.execute(
        "INSERT INTO document_items (id, file_id, job_id, current_name, current_path, extension, file_size, mime_type, content_hash, source_mtime_ms, content_summary, document_type, key_topics_json, proposed_name, proposed_path, proposed_tags_json, organization_reasoning, final_name, final_path, status, changes_applied, is_deleted, error_message)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23)
         ON CONFLICT(job_id, file_id) DO UPDATE SET
            current_name = excluded.current_name,
            current_path = excluded.current_path,
            file_size = excluded.file_size,
            mime_type = excluded.mime_type,
            content_hash = excluded.content_hash,
            source_mtime_ms = excluded.source_mtime_ms,
            content_summary = excluded.content_summary,
            document_type = excluded.document_type,
            key_topics_json = excluded.key_topics_json,
            proposed_name = excluded.proposed_name,
            proposed_path = excluded.proposed_path,
            proposed_tags_json = excluded.proposed_tags_json,
            organization_reasoning = excluded.organization_reasoning,
            final_name = excluded.final_name,
            final_path = excluded.final_path,
            status = excluded.status,
            changes_applied = excluded.changes_applied,
            is_deleted = excluded.is_deleted,
            error_message = excluded.error_message",
        params![
            item.id.as_str(),
            item.file_id,
            item.job_id.as_str(),
            item.current_name,
            item.current_path,
            item.extension,
            item.file_size as i64,
            item.mime_type,
            item.content_hash,
            item.source_mtime_ms as i64,
            item.content_summary,
            item.document_type,
            key_topics_json,
            item.proposed_name,
            item.proposed_path,
            proposed_tags_json,
            item.organization_reasoning,
            item.final_name,
            item.final_path,
            item.status.to_string(),
            item.changes_applied as i64,
            item.is_deleted as i64,
            item.error_message,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &DocumentItemId) -> Result<Option<DocumentItem>, StoreError> {
    conn.query_row("SELECT * FROM document_items WHERE id = ?1", params![id.as_str()], row_to_item)
        .optional()
        .map_err(StoreError::from)
}

/// Find a document item by its stable per-source-path key, for the
/// idempotent re-indexing invariant (spec §8 R3).
pub fn get_by_file_id(conn: &Connection, job_id: &JobId, file_id: &str) -> Result<Option<DocumentItem>, StoreError> {
    conn.query_row(
        "SELECT * FROM document_items WHERE job_id = ?1 AND file_id = ?2",
        params![job_id.as_str(), file_id],
        row_to_item,
    )
    .optional()
    .map_err(StoreError::from)
}

pub fn list_by_job(conn: &Connection, job_id: &JobId) -> Result<Vec<DocumentItem>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM document_items WHERE job_id = ?1 ORDER BY current_path")?;
    let rows = stmt.query_map(params![job_id.as_str()], row_to_item)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

/// Group document ids by content hash, for the Duplicate Resolver
/// (spec §4.6).
pub fn group_by_content_hash(
    conn: &Connection,
    job_id: &JobId,
) -> Result<Vec<(String, Vec<DocumentItemId>)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT content_hash, id FROM document_items WHERE job_id = ?1 AND content_hash IS NOT NULL ORDER BY content_hash",
    )?;
    let rows = stmt.query_map(params![job_id.as_str()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut groups: Vec<(String, Vec<DocumentItemId>)> = Vec::new();
    for row in rows {
        let (hash, id) = row?;
        match groups.last_mut() {
            Some((last_hash, ids)) if *last_hash == hash => ids.push(DocumentItemId::from_string(id)),
            _ => groups.push((hash, vec![DocumentItemId::from_string(id)])),
        }
    }
    Ok(groups.into_iter().filter(|(_, ids)| ids.len() > 1).collect())
}
