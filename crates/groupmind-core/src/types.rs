// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
}

// --- Provider types ---

/// A single chat message sent to an LLM provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "user" or "assistant".
    pub role: String,
    /// Plain text content.
    pub content: String,
}

impl ProviderMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// Optional system prompt, sent ahead of `messages`.
    pub system_prompt: Option<String>,
    /// Conversation messages.
    pub messages: Vec<ProviderMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// Token counts reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Provider-assigned response id.
    pub id: String,
    /// Generated text.
    pub content: String,
    /// Model that produced the response.
    pub model: String,
    /// Why generation stopped, if reported.
    pub stop_reason: Option<String>,
    /// Token usage for cost tracking.
    pub usage: TokenUsage,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Texts to embed, in order.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One vector per input text, same order as the input.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimension of every vector in `embeddings`.
    pub dimensions: usize,
}
