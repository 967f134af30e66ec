// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Groupmind.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Groupmind configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupmindConfig {
    /// Bot identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Memory subsystem settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// OpenAI-compatible API settings (embeddings and chat completions).
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name the bot uses when its own replies are ingested as dialogue turns.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "groupmind".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Memory subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Root directory holding one index directory per (group, category).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory that category exports are written into.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Maximum number of recent messages kept per group.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// A summarization pass runs on every n-th ingested dialogue turn.
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,

    /// Number of documents returned per category by recall.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Model used for fact extraction.
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,

    /// Text embedded once to learn the provider's dimension for a new index.
    #[serde(default = "default_probe_text")]
    pub probe_text: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
            cache_capacity: default_cache_capacity(),
            summary_interval: default_summary_interval(),
            retrieval_k: default_retrieval_k(),
            extraction_model: default_extraction_model(),
            probe_text: default_probe_text(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("groupmind").join("memory"))
        .unwrap_or_else(|| std::path::PathBuf::from("memory"))
        .to_string_lossy()
        .to_string()
}

fn default_export_dir() -> String {
    "exports".to_string()
}

fn default_cache_capacity() -> usize {
    15
}

fn default_summary_interval() -> u64 {
    5
}

fn default_retrieval_k() -> usize {
    3
}

fn default_extraction_model() -> String {
    "gpt-4o".to_string()
}

fn default_probe_text() -> String {
    "測試句子".to_string()
}

/// OpenAI-compatible API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the API, without a trailing path segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for user-facing replies.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Maximum tokens to generate per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries after a transient (429/500/503) response.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_retries() -> u32 {
    1
}
