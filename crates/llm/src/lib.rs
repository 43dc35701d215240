// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local and remote LLM clients used by the Indexer, Duplicate/Version
//! Resolvers, and Organization Planner (spec §4.3, §4.4).

pub mod error;
pub mod json_extract;
pub mod local;
pub mod remote;
pub mod retry;
pub mod types;

pub use error::LlmError;
pub use local::{HttpLocalLlmClient, LocalLlmClient, MockLocalLlmClient};
pub use remote::{HttpRemoteLlmClient, MockRemoteLlmClient, RemoteLlmClient};
pub use retry::{with_retry, BackoffPolicy};
pub use types::{DeliberateRequest, DeliberateResponse, SummarizeRequest, SummarizeResponse};
