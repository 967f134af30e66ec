// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM completions.

use async_trait::async_trait;

use crate::error::GroupmindError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for LLM provider integrations.
///
/// Used for fact extraction during summarization passes and for the
/// user-facing reply.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest)
    -> Result<ProviderResponse, GroupmindError>;
}
