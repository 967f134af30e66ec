// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Groupmind.
//!
//! TOML parsing with strict validation (`deny_unknown_fields`), XDG file
//! hierarchy lookup, `GROUPMIND_*` environment overrides, and miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! use groupmind_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("cache capacity: {}", config.memory.cache_capacity);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AgentConfig, GroupmindConfig, MemoryConfig, OpenAiConfig};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<GroupmindConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<GroupmindConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<GroupmindConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<GroupmindConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<GroupmindConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read every existing file of the hierarchy for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::hierarchy_paths()
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
