// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline schema creation. No external migration tool: the entity set is
//! fixed and small enough that `CREATE TABLE IF NOT EXISTS` at `Store::open`
//! is sufficient (spec §4.5-§4.9's data model, ambient stack notes).

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    current_phase TEXT,
    progress INTEGER NOT NULL,
    source_archive_path TEXT NOT NULL,
    output_archive_path TEXT NOT NULL,
    counters_json TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    started_at_ms INTEGER,
    completed_at_ms INTEGER,
    error_message TEXT,
    review_required INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS document_items (
    id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    current_name TEXT NOT NULL,
    current_path TEXT NOT NULL,
    extension TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    content_hash TEXT,
    source_mtime_ms INTEGER NOT NULL,
    content_summary TEXT NOT NULL,
    document_type TEXT NOT NULL,
    key_topics_json TEXT NOT NULL,
    proposed_name TEXT,
    proposed_path TEXT,
    proposed_tags_json TEXT NOT NULL,
    organization_reasoning TEXT,
    final_name TEXT,
    final_path TEXT,
    status TEXT NOT NULL,
    changes_applied INTEGER NOT NULL,
    is_deleted INTEGER NOT NULL,
    error_message TEXT,
    UNIQUE(job_id, file_id)
);
CREATE INDEX IF NOT EXISTS idx_document_items_job ON document_items(job_id);
CREATE INDEX IF NOT EXISTS idx_document_items_hash ON document_items(job_id, content_hash);

CREATE TABLE IF NOT EXISTS duplicate_groups (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    content_hash TEXT NOT NULL,
    file_count INTEGER NOT NULL,
    total_size INTEGER NOT NULL,
    primary_document_id TEXT NOT NULL,
    decision_reasoning TEXT,
    decided_by TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS duplicate_members (
    group_id TEXT NOT NULL REFERENCES duplicate_groups(id),
    document_id TEXT NOT NULL,
    is_primary INTEGER NOT NULL,
    action TEXT NOT NULL,
    action_reasoning TEXT,
    shortcut_target_path TEXT,
    PRIMARY KEY (group_id, document_id)
);

CREATE TABLE IF NOT EXISTS version_chains (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    chain_name TEXT NOT NULL,
    base_path TEXT NOT NULL,
    current_document_id TEXT NOT NULL,
    current_version_number INTEGER NOT NULL,
    detection_method TEXT NOT NULL,
    detection_confidence REAL NOT NULL,
    llm_reasoning TEXT,
    version_order_confirmed INTEGER NOT NULL,
    archive_strategy TEXT NOT NULL,
    archive_path TEXT
);

CREATE TABLE IF NOT EXISTS version_chain_members (
    chain_id TEXT NOT NULL REFERENCES version_chains(id),
    document_id TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    version_label TEXT,
    version_date TEXT,
    is_current INTEGER NOT NULL,
    status TEXT NOT NULL,
    proposed_version_name TEXT,
    proposed_version_path TEXT,
    PRIMARY KEY (chain_id, document_id)
);

CREATE TABLE IF NOT EXISTS naming_schemas (
    planning_batch_id TEXT NOT NULL,
    document_type TEXT NOT NULL,
    naming_pattern TEXT NOT NULL,
    example TEXT NOT NULL,
    description TEXT NOT NULL,
    placeholder_definitions_json TEXT NOT NULL,
    schema_version INTEGER NOT NULL,
    PRIMARY KEY (planning_batch_id, document_type)
);

CREATE TABLE IF NOT EXISTS tag_taxonomy (
    planning_batch_id TEXT NOT NULL,
    tag_name TEXT NOT NULL,
    parent TEXT,
    description TEXT NOT NULL,
    usage_count INTEGER NOT NULL,
    PRIMARY KEY (planning_batch_id, tag_name)
);

CREATE TABLE IF NOT EXISTS directory_structure (
    planning_batch_id TEXT NOT NULL,
    path TEXT NOT NULL,
    folder_name TEXT NOT NULL,
    parent_path TEXT,
    depth INTEGER NOT NULL,
    purpose TEXT NOT NULL,
    expected_tags_json TEXT NOT NULL,
    expected_document_types_json TEXT NOT NULL,
    PRIMARY KEY (planning_batch_id, path)
);

CREATE TABLE IF NOT EXISTS shortcuts (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    reason TEXT NOT NULL,
    shortcut_path TEXT NOT NULL,
    shortcut_type TEXT NOT NULL,
    target_document_id TEXT NOT NULL,
    target_path TEXT NOT NULL,
    original_path TEXT NOT NULL,
    original_hash TEXT,
    created INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS execution_log (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id),
    document_id TEXT,
    action TEXT NOT NULL,
    source_path TEXT,
    dest_path TEXT NOT NULL,
    outcome TEXT NOT NULL,
    error_message TEXT,
    sequence_number INTEGER NOT NULL,
    recorded_at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_execution_log_job ON execution_log(job_id, sequence_number);
"#;
