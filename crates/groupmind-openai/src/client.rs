// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI REST API.
//!
//! Provides [`OpenAiClient`] which handles bearer authentication, JSON
//! request construction, and bounded retry of transient errors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest,
    EmbeddingResponse,
};

/// Errors surfaced by [`OpenAiClient`]. Adapters map these onto the
/// provider or embedding variant of `GroupmindError`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: &str, base_url: &str, max_retries: u32) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ApiError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /chat/completions`.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiError> {
        self.post_json("chat/completions", request).await
    }

    /// `POST /embeddings`.
    pub async fn embeddings(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, ApiError> {
        self.post_json("embeddings", request).await
    }

    /// Sends `body` to `path`, retrying transient statuses up to `max_retries` times.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, path, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self.client.post(&url).json(body).send().await?;
            let status = response.status();
            debug!(status = %status, attempt, path, "response received");

            if status.is_success() {
                let text = response.text().await?;
                return Ok(serde_json::from_str(&text)?);
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient error, will retry");
                continue;
            }

            return Err(status_error(status, &text));
        }

        Err(ApiError::Status {
            status: 0,
            message: "request failed after retries".into(),
        })
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(kind) => format!("{kind}: {}", api_err.error.message),
            None => api_err.error.message,
        },
        Err(_) => body.to_string(),
    };
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Status codes worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
