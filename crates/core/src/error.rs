// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kind taxonomy shared across the pipeline (spec §7).
//!
//! Every crate defines its own `thiserror` error type for its local
//! concerns, but every error that can reach a `DocumentItem`, a phase
//! outcome, or the job's `error_message` is classified into one of these
//! kinds so callers can apply the propagation policy of §7 uniformly.

use serde::{Deserialize, Serialize};

/// Classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Filesystem or archive I/O failure.
    Io,
    /// Relational store gateway failure.
    Store,
    /// Remote endpoint unreachable or returned a network-level error.
    Network,
    /// Endpoint signaled rate limiting.
    RateLimit,
    /// Downstream service degraded beyond retry budget.
    Unavailable,
    /// Text extractor does not support this format.
    Unsupported,
    /// File content could not be parsed by its format's extractor.
    Corrupt,
    /// LLM output could not be parsed into the expected shape.
    Malformed,
    /// Organization Planner left too many items unassigned.
    PlanningIncomplete,
    /// Plan failed referential validation.
    Validation,
    /// Two planned operations target the same path.
    Conflict,
    /// Operation was cancelled cooperatively.
    Cancelled,
    /// Invariant breach; terminates the job immediately.
    Fatal,
}

impl ErrorKind {
    /// Whether a failure of this kind should be retried with backoff,
    /// per the classification rule of spec §4.3/§9 (`classify_error`).
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::RateLimit | ErrorKind::Unavailable)
    }
}

crate::simple_display! {
    ErrorKind {
        Io => "io",
        Store => "store",
        Network => "network",
        RateLimit => "rate_limit",
        Unavailable => "unavailable",
        Unsupported => "unsupported",
        Corrupt => "corrupt",
        Malformed => "malformed",
        PlanningIncomplete => "planning_incomplete",
        Validation => "validation",
        Conflict => "conflict",
        Cancelled => "cancelled",
        Fatal => "fatal",
    }
}

/// A classified error with a human-readable message, suitable for
/// recording on a `DocumentItem`, an `ExecutionLogEntry`, or `Job.error_message`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }
}
