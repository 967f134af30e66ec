// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Groupmind configuration system.

use std::io::Write;

use groupmind_config::diagnostic::ConfigError;
use groupmind_config::model::GroupmindConfig;
use groupmind_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_groupmind_config() {
    let toml = r#"
[agent]
name = "小幫手"
log_level = "debug"

[memory]
data_dir = "/tmp/gm"
export_dir = "/tmp/gm-exports"
cache_capacity = 30
summary_interval = 10
retrieval_k = 5
extraction_model = "gpt-4o-mini"
probe_text = "probe"

[openai]
api_key = "sk-test"
base_url = "http://localhost:9999/v1"
chat_model = "gpt-4o-mini"
embedding_model = "text-embedding-3-large"
max_tokens = 256
max_retries = 3
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "小幫手");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.memory.data_dir, "/tmp/gm");
    assert_eq!(config.memory.export_dir, "/tmp/gm-exports");
    assert_eq!(config.memory.cache_capacity, 30);
    assert_eq!(config.memory.summary_interval, 10);
    assert_eq!(config.memory.retrieval_k, 5);
    assert_eq!(config.memory.extraction_model, "gpt-4o-mini");
    assert_eq!(config.memory.probe_text, "probe");
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.openai.base_url, "http://localhost:9999/v1");
    assert_eq!(config.openai.embedding_model, "text-embedding-3-large");
    assert_eq!(config.openai.max_tokens, 256);
    assert_eq!(config.openai.max_retries, 3);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "groupmind");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.memory.cache_capacity, 15);
    assert_eq!(config.memory.summary_interval, 5);
    assert_eq!(config.memory.retrieval_k, 3);
    assert_eq!(config.memory.extraction_model, "gpt-4o");
    assert_eq!(config.memory.export_dir, "exports");
    assert!(config.openai.api_key.is_none());
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.openai.max_retries, 1);
}

#[test]
fn unknown_field_in_memory_produces_error() {
    let toml = r#"
[memory]
capacity = 3
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("capacity"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "x"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// A dotted key merged after the file wins, as `GROUPMIND_OPENAI_API_KEY` does.
#[test]
fn env_style_override_beats_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: GroupmindConfig = Figment::new()
        .merge(Serialized::defaults(GroupmindConfig::default()))
        .merge(Toml::string("[openai]\napi_key = \"from-toml\"\n"))
        .merge(("openai.api_key", "from-env"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.openai.api_key.as_deref(), Some("from-env"));
}

#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: GroupmindConfig = Figment::new()
        .merge(Serialized::defaults(GroupmindConfig::default()))
        .merge(Toml::file("/nonexistent/path/groupmind.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.agent.name, "groupmind");
}

#[test]
fn diagnostic_unknown_key_carries_suggestion_and_valid_keys() {
    let toml = r#"
[memory]
summary_intervall = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "summary_intervall"
                && suggestion.as_deref() == Some("summary_interval")
                && valid_keys.contains("cache_capacity")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn diagnostic_invalid_type_names_the_key() {
    let toml = r#"
[memory]
retrieval_k = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("retrieval_k"))),
        "got: {errors:?}"
    );
}

#[test]
fn validation_runs_after_successful_parse() {
    let toml = r#"
[memory]
cache_capacity = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero capacity is invalid");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("cache_capacity"))));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "retreival_k".to_string(),
        suggestion: Some("retrieval_k".to_string()),
        valid_keys: "data_dir, retrieval_k".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("should have help").to_string();
    assert!(help.contains("did you mean `retrieval_k`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("retreival_k"));
}

#[test]
fn load_and_validate_path_reads_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[memory]\nretrieval_k = 7").unwrap();

    let config = load_and_validate_path(file.path()).expect("file should load");
    assert_eq!(config.memory.retrieval_k, 7);
}

#[test]
fn load_and_validate_path_points_at_bad_key() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[memory]\ncache_capacty = 7").unwrap();

    let errors = load_and_validate_path(file.path()).expect_err("typo should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion, .. }
            if key == "cache_capacty" && suggestion.as_deref() == Some("cache_capacity")
    )));
}
