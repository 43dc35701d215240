// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ProgressSink`: lets a phase report progress without knowing how the
//! job controller persists it (spec §4.5 "progress reported at least every
//! P items or every T seconds").

/// Receives progress updates from a running phase.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, processed: u64, total: u64);
}

/// Discards all progress updates; used in tests and one-shot CLI runs.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _processed: u64, _total: u64) {}
}

/// Forwards progress to `tracing`, for phases run without a richer sink.
pub struct TracingProgressSink {
    pub phase: &'static str,
}

impl ProgressSink for TracingProgressSink {
    fn on_progress(&self, processed: u64, total: u64) {
        tracing::debug!(phase = self.phase, processed, total, "phase progress");
    }
}
