// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI adapters for Groupmind.
//!
//! [`OpenAiProvider`] implements [`ProviderAdapter`] over chat completions and
//! [`OpenAiEmbedder`] implements [`EmbeddingAdapter`] over the embeddings
//! endpoint. Both share one [`OpenAiClient`].
//!
//! API key resolution order: `openai.api_key` -> `OPENAI_API_KEY` env var -> error.

pub mod client;
pub mod types;

use async_trait::async_trait;
use groupmind_config::GroupmindConfig;
use groupmind_core::error::GroupmindError;
use groupmind_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use groupmind_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, ProviderRequest,
    ProviderResponse, TokenUsage,
};
use tracing::{debug, info};

use crate::client::{ApiError, OpenAiClient};
use crate::types::{ChatCompletionRequest, ChatMessage, EmbeddingRequest};

/// Resolves the API key from config, falling back to `OPENAI_API_KEY`.
pub fn resolve_api_key(configured: &Option<String>) -> Result<String, GroupmindError> {
    if let Some(key) = configured.as_ref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.clone());
    }
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(GroupmindError::Config(
            "no OpenAI API key: set openai.api_key or OPENAI_API_KEY".into(),
        )),
    }
}

/// Builds the shared client from `[openai]` settings.
pub fn client_from_config(config: &GroupmindConfig) -> Result<OpenAiClient, GroupmindError> {
    let api_key = resolve_api_key(&config.openai.api_key)?;
    OpenAiClient::new(&api_key, &config.openai.base_url, config.openai.max_retries)
        .map_err(|e| GroupmindError::Config(e.to_string()))
}

fn provider_error(err: ApiError) -> GroupmindError {
    GroupmindError::Provider {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}

fn embedding_error(err: ApiError) -> GroupmindError {
    GroupmindError::Embedding {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}

/// Chat completion provider.
pub struct OpenAiProvider {
    client: OpenAiClient,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(client: OpenAiClient, default_model: impl Into<String>) -> Self {
        Self {
            client,
            default_model: default_model.into(),
        }
    }

    pub fn from_config(config: &GroupmindConfig) -> Result<Self, GroupmindError> {
        let provider = Self::new(client_from_config(config)?, &config.openai.chat_model);
        info!(model = %provider.default_model, "OpenAI provider initialized");
        Ok(provider)
    }

    fn to_chat_request(&self, request: ProviderRequest) -> ChatCompletionRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };

        let messages = request
            .system_prompt
            .map(|prompt| ChatMessage::new("system", prompt))
            .into_iter()
            .chain(
                request
                    .messages
                    .into_iter()
                    .map(|m| ChatMessage::new(m.role, m.content)),
            )
            .collect();

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: (request.max_tokens > 0).then_some(request.max_tokens),
        }
    }
}

impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, GroupmindError> {
        let api_request = self.to_chat_request(request);
        let response = self
            .client
            .chat_completion(&api_request)
            .await
            .map_err(provider_error)?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GroupmindError::Provider {
                message: "completion returned no choices".into(),
                source: None,
            }
        })?;
        let usage = response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            id: response.id,
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

/// Texts sent per embeddings request; the API caps one request at 2048 inputs.
pub const EMBEDDING_BATCH_SIZE: usize = 1000;

/// Embedding provider.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &GroupmindConfig) -> Result<Self, GroupmindError> {
        let embedder = Self::new(client_from_config(config)?, &config.openai.embedding_model);
        info!(model = %embedder.model, "OpenAI embedder initialized");
        Ok(embedder)
    }
}

impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
}

impl OpenAiEmbedder {
    /// Embeds one request's worth of texts, returning vectors in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GroupmindError> {
        let expected = texts.len();
        let response = self
            .client
            .embeddings(&EmbeddingRequest {
                model: self.model.clone(),
                input: texts.to_vec(),
            })
            .await
            .map_err(embedding_error)?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(GroupmindError::embedding(format!(
                "expected {expected} embeddings, got {}",
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, GroupmindError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: 0,
            });
        }

        let mut embeddings = Vec::with_capacity(input.texts.len());
        for (batch, texts) in input.texts.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
            debug!(batch, size = texts.len(), "requesting embeddings");
            embeddings.extend(self.embed_batch(texts).await?);
        }

        let dimensions = embeddings[0].len();
        if dimensions == 0 {
            return Err(GroupmindError::embedding("provider returned an empty vector"));
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
            return Err(GroupmindError::embedding(format!(
                "inconsistent embedding dimensions: {dimensions} and {}",
                bad.len()
            )));
        }

        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}
