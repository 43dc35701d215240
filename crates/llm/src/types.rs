// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response shapes shared by the local and remote clients.

use serde::{Deserialize, Serialize};

/// A bulk, low-latency summarization request sent to the local LLM during
/// indexing (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub system_prompt: String,
    pub content: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub document_type: String,
    pub key_topics: Vec<String>,
}

/// A deliberative prompt sent to the remote LLM for arbitration or planning
/// (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberateRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberateResponse {
    pub text: String,
}
