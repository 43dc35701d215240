// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-LLM client: bulk, fast summarization used by the Indexer and as
//! the arbitration model for the Duplicate/Version Resolvers (spec §4.3).

use crate::retry::{with_retry, BackoffPolicy};
use crate::types::{DeliberateRequest, DeliberateResponse, SummarizeRequest, SummarizeResponse};
use crate::LlmError;
use arc_core::config::LlmEndpointConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait LocalLlmClient: Send + Sync {
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummarizeResponse, LlmError>;

    /// Free-form arbitration prompt used by the Duplicate/Version Resolvers
    /// (spec §4.3 "used ... for arbitration prompts"), distinct from
    /// `summarize`'s fixed response shape.
    async fn arbitrate(&self, request: DeliberateRequest) -> Result<DeliberateResponse, LlmError>;

    /// Arbitration where the caller expects a JSON payload shaped like `T`.
    async fn arbitrate_json<T: DeserializeOwned + Send>(&self, request: DeliberateRequest) -> Result<T, LlmError> {
        let response = self.arbitrate(request).await?;
        crate::json_extract::extract_json(&response.text)
    }
}

#[derive(serde::Deserialize)]
struct RawCompletion {
    content: String,
}

pub struct HttpLocalLlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    policy: BackoffPolicy,
}

impl HttpLocalLlmClient {
    pub fn new(config: &LlmEndpointConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            policy: BackoffPolicy::local_default(),
        })
    }
}

#[async_trait]
impl LocalLlmClient for HttpLocalLlmClient {
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummarizeResponse, LlmError> {
        with_retry(
            self.policy,
            |e: &LlmError| e.is_transient(),
            |e: &LlmError| e.retry_after(),
            || async {
                let body = serde_json::json!({
                    "model": self.model,
                    "system": request.system_prompt,
                    "prompt": request.content,
                    "max_tokens": request.max_tokens,
                });
                let response = self.http.post(&self.endpoint).json(&body).send().await?;
                if response.status().as_u16() == 429 {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(10);
                    return Err(LlmError::RateLimited { retry_after: Duration::from_secs(retry_after) });
                }
                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    return Err(LlmError::ApiError { status, message });
                }
                let raw: RawCompletion = response.json().await?;
                parse_summary(&raw.content)
            },
        )
        .await
    }

    async fn arbitrate(&self, request: DeliberateRequest) -> Result<DeliberateResponse, LlmError> {
        with_retry(
            self.policy,
            |e: &LlmError| e.is_transient(),
            |e: &LlmError| e.retry_after(),
            || async {
                let body = serde_json::json!({
                    "model": self.model,
                    "system": request.system_prompt,
                    "prompt": request.prompt,
                    "max_tokens": request.max_tokens,
                });
                let response = self.http.post(&self.endpoint).json(&body).send().await?;
                if response.status().as_u16() == 429 {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(10);
                    return Err(LlmError::RateLimited { retry_after: Duration::from_secs(retry_after) });
                }
                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    return Err(LlmError::ApiError { status, message });
                }
                let raw: RawCompletion = response.json().await?;
                Ok(DeliberateResponse { text: raw.content })
            },
        )
        .await
    }
}

/// The local model is instructed to answer with one JSON object; parsing
/// reuses the same three-stage extractor as the remote client.
fn parse_summary(content: &str) -> Result<SummarizeResponse, LlmError> {
    crate::json_extract::extract_json(content)
}

/// In-memory client for engine tests, returning canned responses in order.
pub struct MockLocalLlmClient {
    responses: parking_lot::Mutex<std::collections::VecDeque<SummarizeResponse>>,
    arbitrations: parking_lot::Mutex<std::collections::VecDeque<String>>,
}

impl MockLocalLlmClient {
    pub fn new(responses: Vec<SummarizeResponse>) -> Self {
        Self { responses: parking_lot::Mutex::new(responses.into()), arbitrations: parking_lot::Mutex::new(Default::default()) }
    }

    /// Same as [`Self::new`] but also seeds canned `arbitrate` prose responses.
    pub fn with_arbitrations(responses: Vec<SummarizeResponse>, arbitrations: Vec<String>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            arbitrations: parking_lot::Mutex::new(arbitrations.into()),
        }
    }
}

#[async_trait]
impl LocalLlmClient for MockLocalLlmClient {
    async fn summarize(&self, _request: SummarizeRequest) -> Result<SummarizeResponse, LlmError> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| LlmError::Malformed("no more mock responses".into()))
    }

    async fn arbitrate(&self, _request: DeliberateRequest) -> Result<DeliberateResponse, LlmError> {
        self.arbitrations
            .lock()
            .pop_front()
            .map(|text| DeliberateResponse { text })
            .ok_or_else(|| LlmError::Malformed("no more mock arbitrations".into()))
    }
}
