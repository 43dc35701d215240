// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over the `jobs` table (spec §3 `Job`, §4.10).

use crate::StoreError;
use arc_core::job::{Job, JobCounters, JobId, JobStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    let status: String = row.get("status")?;
    let counters_json: String = row.get("counters_json")?;
    let review_required: i64 = row.get("review_required")?;
    Ok(Job {
        id: JobId::from_string(row.get::<_, String>("id")?),
        status: parse_job_status(&status),
        current_phase: row.get("current_phase")?,
        progress: row.get::<_, i64>("progress")? as u8,
        source_archive_path: PathBuf::from(row.get::<_, String>("source_archive_path")?),
        output_archive_path: PathBuf::from(row.get::<_, String>("output_archive_path")?),
        counters: serde_json::from_str::<JobCounters>(&counters_json).unwrap_or_default(),
        created_at_ms: row.get::<_, i64>("created_at_ms")? as u64,
        started_at_ms: row.get::<_, Option<i64>>("started_at_ms")?.map(|v| v as u64),
        completed_at_ms: row.get::<_, Option<i64>>("completed_at_ms")?.map(|v| v as u64),
        error_message: row.get("error_message")?,
        review_required: review_required != 0,
    })
}

fn parse_job_status(s: &str) -> JobStatus {
    match s {
        "pending" => JobStatus::Pending,
        "extracting" => JobStatus::Extracting,
        "indexing" => JobStatus::Indexing,
        "deduplicating" => JobStatus::Deduplicating,
        "versioning" => JobStatus::Versioning,
        "organizing" => JobStatus::Organizing,
        "review_required" => JobStatus::ReviewRequired,
        "executing" => JobStatus::Executing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Cancelled,
    }
}

pub fn upsert(conn: &Connection, job: &Job) -> Result<(), StoreError> {
    let counters_json = serde_json::to_string(&job.counters).unwrap_or_else(|_| "{}".into());
    conn.execute(
        "INSERT INTO jobs (id, status, current_phase, progress, source_archive_path, output_archive_path, counters_json, created_at_ms, started_at_ms, completed_at_ms, error_message, review_required)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            current_phase = excluded.current_phase,
            progress = excluded.progress,
            counters_json = excluded.counters_json,
            started_at_ms = excluded.started_at_ms,
            completed_at_ms = excluded.completed_at_ms,
            error_message = excluded.error_message",
        params![
            job.id.as_str(),
            job.status.to_string(),
            job.current_phase,
            job.progress as i64,
            job.source_archive_path.to_string_lossy(),
            job.output_archive_path.to_string_lossy(),
            counters_json,
            job.created_at_ms as i64,
            job.started_at_ms.map(|v| v as i64),
            job.completed_at_ms.map(|v| v as i64),
            job.error_message,
            job.review_required as i64,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &JobId) -> Result<Option<Job>, StoreError> {
    conn.query_row("SELECT * FROM jobs WHERE id = ?1", params![id.as_str()], row_to_job)
        .optional()
        .map_err(StoreError::from)
}

pub fn list(conn: &Connection) -> Result<Vec<Job>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at_ms")?;
    let rows = stmt.query_map([], row_to_job)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}
