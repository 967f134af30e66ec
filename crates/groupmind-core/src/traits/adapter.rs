// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all external collaborators implement.

use crate::types::AdapterType;

/// The base trait for Groupmind adapters.
///
/// Every adapter (embedding provider, LLM provider) implements this trait,
/// which identifies it in logs.
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;
}
