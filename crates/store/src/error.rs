// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the relational store gateway.

use arc_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Sqlite(_) => ErrorKind::Store,
            StoreError::NotFound(_) => ErrorKind::Store,
            StoreError::Invariant(_) => ErrorKind::Conflict,
        }
    }
}
