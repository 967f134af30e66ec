// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Groupmind.

use thiserror::Error;

/// The primary error type used across all Groupmind adapter traits and memory operations.
#[derive(Debug, Error)]
pub enum GroupmindError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence errors (index read/write failure, corrupt or incompatible index files).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding provider errors (API failure, empty or malformed vectors).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rejected input, such as an unknown memory category tag.
    #[error("validation error: {0}")]
    Validation(String),

    /// Fact extraction produced a response that could not be used.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GroupmindError {
    /// Wraps any error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        GroupmindError::Storage {
            source: Box::new(err),
        }
    }

    /// Builds an embedding error without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        GroupmindError::Embedding {
            message: message.into(),
            source: None,
        }
    }
}

impl From<std::io::Error> for GroupmindError {
    fn from(err: std::io::Error) -> Self {
        GroupmindError::storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_helper_keeps_source_message() {
        let err = GroupmindError::storage(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn io_error_converts_to_storage() {
        let err: GroupmindError = std::io::Error::other("permission denied").into();
        assert!(matches!(err, GroupmindError::Storage { .. }));
    }

    #[test]
    fn validation_message_is_rendered() {
        let err = GroupmindError::Validation("unknown category `notes`".into());
        assert_eq!(err.to_string(), "validation error: unknown category `notes`");
    }
}
