// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./groupmind.toml` > `~/.config/groupmind/groupmind.toml`
//! > `/etc/groupmind/groupmind.toml` with environment variable overrides via
//! the `GROUPMIND_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GroupmindConfig;

const SYSTEM_CONFIG: &str = "/etc/groupmind/groupmind.toml";
const LOCAL_CONFIG: &str = "groupmind.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/groupmind/groupmind.toml` (system-wide)
/// 3. `~/.config/groupmind/groupmind.toml` (user XDG config)
/// 4. `./groupmind.toml` (local directory)
/// 5. `GROUPMIND_*` environment variables
pub fn load_config() -> Result<GroupmindConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<GroupmindConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GroupmindConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GroupmindConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GroupmindConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the XDG hierarchy, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GroupmindConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Path of the per-user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("groupmind").join("groupmind.toml"))
}

/// Paths of every file in the hierarchy, lowest precedence first.
pub(crate) fn hierarchy_paths() -> Vec<std::path::PathBuf> {
    let mut paths = vec![std::path::PathBuf::from(SYSTEM_CONFIG)];
    if let Some(user) = user_config_path() {
        paths.push(user);
    }
    paths.push(
        std::env::current_dir()
            .map(|d| d.join(LOCAL_CONFIG))
            .unwrap_or_else(|_| std::path::PathBuf::from(LOCAL_CONFIG)),
    );
    paths
}

/// Environment provider with an explicit section mapping.
///
/// `Env::split("_")` would turn `GROUPMIND_MEMORY_CACHE_CAPACITY` into
/// `memory.cache.capacity`; only the first segment names the section.
fn env_provider() -> Env {
    Env::prefixed("GROUPMIND_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ["agent", "memory", "openai"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
