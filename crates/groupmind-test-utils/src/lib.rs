// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Groupmind integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests
//! without external services.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Deterministic character n-gram embedder
//! - [`MockProvider`] - Mock LLM provider with scripted responses

pub mod mock_embedder;
pub mod mock_provider;

pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
