// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Store`: the relational store gateway (spec §4.5-§4.9, §5).

use crate::schema::SCHEMA;
use crate::StoreError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Guards the single `rusqlite::Connection` the same way the teacher guards
/// its `MaterializedState` behind a `parking_lot::Mutex` — sqlite
/// connections aren't `Sync`, so one connection per `Store`, serialized.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "opened store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run `f` inside a write transaction, committing on `Ok` and rolling
    /// back on `Err` (spec §3.5 "multi-row writes commit together").
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Run `f` against a read-only, deferred transaction, matching spec
    /// §5's requirement that the Organization Planner's inventory read
    /// doesn't block concurrent phase writes.
    pub fn with_read_only<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.pragma_update(None, "query_only", true)?;
        let result = f(&tx);
        tx.pragma_update(None, "query_only", false)?;
        tx.rollback()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_creates_schema() {
        let store = Store::open_in_memory().unwrap();
        let count: i64 = store
            .with_read_only(|tx| {
                tx.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0)).map_err(StoreError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), StoreError> = store.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO jobs (id, status, current_phase, progress, source_archive_path, output_archive_path, counters_json, created_at_ms, started_at_ms, completed_at_ms, error_message, review_required) VALUES ('job-x', 'pending', NULL, 0, 'a', 'b', '{}', 0, NULL, NULL, NULL, 0)",
                [],
            )?;
            Err(StoreError::Invariant("force rollback".into()))
        });
        assert!(result.is_err());
        let count: i64 = store
            .with_read_only(|tx| tx.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0)).map_err(StoreError::from))
            .unwrap();
        assert_eq!(count, 0);
    }
}
