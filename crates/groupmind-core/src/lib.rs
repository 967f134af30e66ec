// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Groupmind.
//!
//! This crate provides the error type, the adapter traits for the two
//! external collaborators (embedding provider and LLM provider), and the
//! request/response types they exchange.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GroupmindError;
pub use types::AdapterType;

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
