// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::GroupmindConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every failure.
pub fn validate_config(config: &GroupmindConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` is not one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.agent.name.trim().is_empty() {
        fail("agent.name must not be empty".to_string());
    }

    let memory = &config.memory;
    if memory.data_dir.trim().is_empty() {
        fail("memory.data_dir must not be empty".to_string());
    }
    if memory.export_dir.trim().is_empty() {
        fail("memory.export_dir must not be empty".to_string());
    }
    if memory.cache_capacity < 1 {
        fail(format!(
            "memory.cache_capacity must be at least 1, got {}",
            memory.cache_capacity
        ));
    }
    if memory.summary_interval < 1 {
        fail(format!(
            "memory.summary_interval must be at least 1, got {}",
            memory.summary_interval
        ));
    }
    if memory.retrieval_k < 1 {
        fail(format!(
            "memory.retrieval_k must be at least 1, got {}",
            memory.retrieval_k
        ));
    }
    if memory.probe_text.is_empty() {
        fail("memory.probe_text must not be empty".to_string());
    }

    if config.openai.base_url.trim().is_empty() {
        fail("openai.base_url must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
