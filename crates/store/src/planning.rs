// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over `naming_schemas`/`tag_taxonomy`/`directory_structure`
//! (spec §3, §4.8).

use crate::StoreError;
use arc_core::planning::{
    topo_sort_taxonomy, validate_taxonomy_acyclic, DirectoryStructureEntry, NamingSchema, TagTaxonomyNode,
};
use rusqlite::{params, Connection};

pub fn put_naming_schema(conn: &Connection, schema: &NamingSchema) -> Result<(), StoreError> {
    let placeholders_json = serde_json::to_string(&schema.placeholder_definitions).unwrap_or_else(|_| "{}".into());
    conn.execute(
        "INSERT INTO naming_schemas (planning_batch_id, document_type, naming_pattern, example, description, placeholder_definitions_json, schema_version)
         VALUES (?1,?2,?3,?4,?5,?6,?7)
         ON CONFLICT(planning_batch_id, document_type) DO UPDATE SET
            naming_pattern = excluded.naming_pattern,
            example = excluded.example,
            description = excluded.description,
            placeholder_definitions_json = excluded.placeholder_definitions_json,
            schema_version = excluded.schema_version",
        params![
            schema.planning_batch_id,
            schema.document_type,
            schema.naming_pattern,
            schema.example,
            schema.description,
            placeholders_json,
            schema.schema_version as i64,
        ],
    )?;
    Ok(())
}

/// Persist a taxonomy batch, inserting parents before children and
/// rejecting a cyclic or over-deep submission (spec §3 invariant, §9).
pub fn put_taxonomy(conn: &Connection, nodes: &[TagTaxonomyNode]) -> Result<(), StoreError> {
    if !validate_taxonomy_acyclic(nodes) {
        return Err(StoreError::Invariant("tag taxonomy is cyclic or exceeds max depth".into()));
    }
    for node in topo_sort_taxonomy(nodes) {
        conn.execute(
            "INSERT INTO tag_taxonomy (planning_batch_id, tag_name, parent, description, usage_count)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(planning_batch_id, tag_name) DO UPDATE SET
                parent = excluded.parent,
                description = excluded.description,
                usage_count = excluded.usage_count",
            params![node.planning_batch_id, node.tag_name, node.parent, node.description, node.usage_count as i64],
        )?;
    }
    Ok(())
}

pub fn put_directory(conn: &Connection, entry: &DirectoryStructureEntry) -> Result<(), StoreError> {
    let expected_tags_json = serde_json::to_string(&entry.expected_tags).unwrap_or_else(|_| "[]".into());
    let expected_types_json = serde_json::to_string(&entry.expected_document_types).unwrap_or_else(|_| "[]".into());
    conn.execute(
        "INSERT INTO directory_structure (planning_batch_id, path, folder_name, parent_path, depth, purpose, expected_tags_json, expected_document_types_json)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(planning_batch_id, path) DO UPDATE SET
            folder_name = excluded.folder_name,
            parent_path = excluded.parent_path,
            depth = excluded.depth,
            purpose = excluded.purpose,
            expected_tags_json = excluded.expected_tags_json,
            expected_document_types_json = excluded.expected_document_types_json",
        params![
            entry.planning_batch_id,
            entry.path,
            entry.folder_name,
            entry.parent_path,
            entry.depth as i64,
            entry.purpose,
            expected_tags_json,
            expected_types_json,
        ],
    )?;
    Ok(())
}

pub fn list_directories(conn: &Connection, planning_batch_id: &str) -> Result<Vec<DirectoryStructureEntry>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT planning_batch_id, path, folder_name, parent_path, depth, purpose, expected_tags_json, expected_document_types_json FROM directory_structure WHERE planning_batch_id = ?1",
    )?;
    let rows = stmt.query_map(params![planning_batch_id], |row| {
        let expected_tags_json: String = row.get(6)?;
        let expected_types_json: String = row.get(7)?;
        Ok(DirectoryStructureEntry {
            planning_batch_id: row.get(0)?,
            path: row.get(1)?,
            folder_name: row.get(2)?,
            parent_path: row.get(3)?,
            depth: row.get::<_, i64>(4)? as u32,
            purpose: row.get(5)?,
            expected_tags: serde_json::from_str(&expected_tags_json).unwrap_or_default(),
            expected_document_types: serde_json::from_str(&expected_types_json).unwrap_or_default(),
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

pub fn list_taxonomy(conn: &Connection, planning_batch_id: &str) -> Result<Vec<TagTaxonomyNode>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT planning_batch_id, tag_name, parent, description, usage_count FROM tag_taxonomy WHERE planning_batch_id = ?1",
    )?;
    let rows = stmt.query_map(params![planning_batch_id], |row| {
        Ok(TagTaxonomyNode {
            planning_batch_id: row.get(0)?,
            tag_name: row.get(1)?,
            parent: row.get(2)?,
            description: row.get(3)?,
            usage_count: row.get::<_, i64>(4)? as u64,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn put_directory_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        let entry = DirectoryStructureEntry {
            planning_batch_id: "batch-1".into(),
            path: "/Finance".into(),
            folder_name: "Finance".into(),
            parent_path: None,
            depth: 1,
            purpose: "financial records".into(),
            expected_tags: vec!["finance".into()],
            expected_document_types: vec!["invoice".into()],
        };
        store.with_transaction(|tx| put_directory(tx, &entry)).unwrap();
        let fetched = store.with_read_only(|tx| list_directories(tx, "batch-1")).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].folder_name, "Finance");
    }

    #[test]
    fn put_taxonomy_rejects_cyclic_batch() {
        let store = Store::open_in_memory().unwrap();
        let nodes = vec![TagTaxonomyNode {
            planning_batch_id: "batch-1".into(),
            tag_name: "a".into(),
            parent: Some("a".into()),
            description: String::new(),
            usage_count: 0,
        }];
        let result = store.with_transaction(|tx| put_taxonomy(tx, &nodes));
        assert!(result.is_err());
    }

    #[test]
    fn put_taxonomy_persists_valid_tree() {
        let store = Store::open_in_memory().unwrap();
        let nodes = vec![
            TagTaxonomyNode {
                planning_batch_id: "batch-1".into(),
                tag_name: "root".into(),
                parent: None,
                description: String::new(),
                usage_count: 0,
            },
            TagTaxonomyNode {
                planning_batch_id: "batch-1".into(),
                tag_name: "child".into(),
                parent: Some("root".into()),
                description: String::new(),
                usage_count: 0,
            },
        ];
        store.with_transaction(|tx| put_taxonomy(tx, &nodes)).unwrap();
        let fetched = store.with_read_only(|tx| list_taxonomy(tx, "batch-1")).unwrap();
        assert_eq!(fetched.len(), 2);
    }
}
