// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use groupmind_core::traits::adapter::PluginAdapter;
use groupmind_core::traits::provider::ProviderAdapter;
use groupmind_core::types::{
    AdapterType, ProviderRequest, ProviderResponse, TokenUsage,
};
use groupmind_core::GroupmindError;

enum Scripted {
    Text(String),
    Failure(String),
}

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every request is recorded.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(Scripted::Text).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .await
            .push_back(Scripted::Text(text.into()));
    }

    /// Queue a provider failure.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .await
            .push_back(Scripted::Failure(message.into()));
    }

    /// Number of `complete` calls received so far.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Clone of every request received, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, GroupmindError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let next = self.responses.lock().await.pop_front();
        let text = match next {
            Some(Scripted::Text(text)) => text,
            Some(Scripted::Failure(message)) => {
                return Err(GroupmindError::Provider {
                    message,
                    source: None,
                });
            }
            None => "mock response".to_string(),
        };

        Ok(ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            content: text,
            model,
            stop_reason: Some("stop".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}
