// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-LLM client: slower, deliberative model used by the Organization
//! Planner and for higher-stakes arbitration decisions (spec §4.4).

use crate::json_extract::extract_json;
use crate::retry::{with_retry, BackoffPolicy};
use crate::types::{DeliberateRequest, DeliberateResponse};
use crate::LlmError;
use arc_core::config::LlmEndpointConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait RemoteLlmClient: Send + Sync {
    /// Free-form deliberation, returning the model's raw prose response.
    async fn deliberate(&self, request: DeliberateRequest) -> Result<DeliberateResponse, LlmError>;

    /// Deliberation where the caller expects a JSON payload shaped like `T`.
    /// Default impl layers the three-stage extractor over `deliberate`.
    async fn deliberate_json<T: DeserializeOwned + Send>(
        &self,
        request: DeliberateRequest,
    ) -> Result<T, LlmError> {
        let response = self.deliberate(request).await?;
        extract_json(&response.text)
    }
}

#[derive(serde::Deserialize)]
struct RawCompletion {
    content: String,
}

pub struct HttpRemoteLlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    policy: BackoffPolicy,
}

impl HttpRemoteLlmClient {
    pub fn new(config: &LlmEndpointConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            policy: BackoffPolicy::remote_default(),
        })
    }
}

#[async_trait]
impl RemoteLlmClient for HttpRemoteLlmClient {
    async fn deliberate(&self, request: DeliberateRequest) -> Result<DeliberateResponse, LlmError> {
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
                        .unwrap_or(30);
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

/// In-memory client for engine tests, returning canned prose in order.
pub struct MockRemoteLlmClient {
    responses: parking_lot::Mutex<std::collections::VecDeque<String>>,
}

impl MockRemoteLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses: parking_lot::Mutex::new(responses.into()) }
    }
}

#[async_trait]
impl RemoteLlmClient for MockRemoteLlmClient {
    async fn deliberate(&self, _request: DeliberateRequest) -> Result<DeliberateResponse, LlmError> {
        self.responses
            .lock()
            .pop_front()
            .map(|text| DeliberateResponse { text })
            .ok_or_else(|| LlmError::Malformed("no more mock responses".into()))
    }
}
