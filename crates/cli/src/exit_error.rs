// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

/// Daemon unreachable, bad arguments, config missing.
pub const EXIT_SETUP: i32 = 2;
/// The job itself failed or was rejected by the daemon.
pub const EXIT_JOB_FAILED: i32 = 3;
/// The job was cancelled, or is still in a non-terminal state when a blocking
/// command expected completion.
pub const EXIT_CANCELLED: i32 = 4;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(EXIT_SETUP, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
