// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for local and remote LLM clients.

use arc_core::ErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("endpoint unavailable: {message}")]
    Unavailable { message: String },

    #[error("api error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("could not parse response into expected shape: {0}")]
    Malformed(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify for the retry combinator and for the pipeline-wide
    /// taxonomy (spec §4.3 `classify_error`, §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Network(_) => ErrorKind::Network,
            LlmError::RateLimited { .. } => ErrorKind::RateLimit,
            LlmError::Unavailable { .. } => ErrorKind::Unavailable,
            LlmError::ApiError { status, .. } if *status >= 500 => ErrorKind::Unavailable,
            LlmError::ApiError { .. } => ErrorKind::Malformed,
            LlmError::Malformed(_) | LlmError::Json(_) => ErrorKind::Malformed,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// Suggested wait before the next retry attempt, if the server told us one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
