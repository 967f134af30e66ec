// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behavior of the memory manager against mock adapters.

use std::path::Path;
use std::sync::Arc;

use groupmind_config::MemoryConfig;
use groupmind_core::GroupmindError;
use groupmind_memory::{split_paragraphs, Category, ExportOutcome, MemoryManager};
use groupmind_test_utils::{MockEmbedder, MockProvider};

struct Fixture {
    _dir: tempfile::TempDir,
    config: MemoryConfig,
    embedder: MockEmbedder,
    provider: MockProvider,
    manager: MemoryManager,
}

impl Fixture {
    fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    fn with_responses(responses: Vec<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let embedder = MockEmbedder::new();
        let provider =
            MockProvider::with_responses(responses.into_iter().map(String::from).collect());
        let manager = build(&config, &embedder, &provider);
        Self {
            _dir: dir,
            config,
            embedder,
            provider,
            manager,
        }
    }

    /// A second manager over the same directories, as after a restart.
    fn restarted(&self) -> MemoryManager {
        build(&self.config, &self.embedder, &self.provider)
    }
}

fn test_config(dir: &Path) -> MemoryConfig {
    MemoryConfig {
        data_dir: dir.join("memory").to_string_lossy().to_string(),
        export_dir: dir.join("exports").to_string_lossy().to_string(),
        ..MemoryConfig::default()
    }
}

fn build(config: &MemoryConfig, embedder: &MockEmbedder, provider: &MockProvider) -> MemoryManager {
    MemoryManager::new(config, Arc::new(embedder.clone()), Arc::new(provider.clone()))
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn uploaded_birthday_is_recalled_for_related_question() {
    let fx = Fixture::new();
    fx.manager
        .ingest_document(
            "g1",
            &lines(&["昭昭：生日6/23", "小美將於週五搬宿舍", "林大恩的綽號是呆呆", "社團會費是每學期五百元"]),
        )
        .await
        .unwrap();

    let hits = fx
        .manager
        .retrieve("g1", Category::Knowledge, "昭昭的生日", 3)
        .await
        .unwrap();
    assert!(hits.iter().any(|h| h.content == "昭昭：生日6/23"), "hits: {hits:?}");
}

#[tokio::test]
async fn fifth_turn_commits_one_stamped_fact() {
    let fx = Fixture::with_responses(vec!["- 測試事實"]);

    for i in 1..=4 {
        let report = fx.manager.ingest_dialogue_turn("g1", "小明", &format!("第{i}句")).await.unwrap();
        assert!(!report.summarized);
    }
    let report = fx.manager.ingest_dialogue_turn("g1", "小明", "第5句").await.unwrap();
    assert_eq!(report.turn, 5);
    assert!(report.summarized);
    assert_eq!(report.facts_committed, 1);

    let docs = fx.manager.store().dump_all("g1", Category::Dialogue).await.unwrap();
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert!(doc.starts_with("測試事實（"), "doc: {doc}");
    assert!(doc.ends_with('）'));
    // "測試事實（YYYY-MM-DD HH:MM:SS）"
    let stamp: String = doc.chars().skip(5).take(19).collect();
    assert!(chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").is_ok(), "stamp: {stamp}");

    let context = &fx.provider.requests().await[0].messages[0].content;
    assert!(context.contains("小明：第1句\n小明：第2句"));
}

#[tokio::test]
async fn four_turns_make_no_llm_call() {
    let fx = Fixture::new();
    for i in 0..4 {
        fx.manager.ingest_dialogue_turn("g1", "u", &i.to_string()).await.unwrap();
    }
    assert_eq!(fx.provider.call_count().await, 0);
    assert!(fx.manager.store().dump_all("g1", Category::Dialogue).await.unwrap().is_empty());
    assert!(fx.manager.retrieve("g1", Category::Dialogue, "0", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn passes_fire_at_every_interval_boundary() {
    let fx = Fixture::with_responses(vec!["- 一", "- 二", "- 三"]);
    for i in 0..15 {
        fx.manager.ingest_dialogue_turn("g1", "u", &i.to_string()).await.unwrap();
    }
    assert_eq!(fx.provider.call_count().await, 3);
    assert_eq!(fx.manager.store().dump_all("g1", Category::Dialogue).await.unwrap().len(), 3);
}

#[tokio::test]
async fn groups_count_turns_independently() {
    let fx = Fixture::new();
    for i in 0..4 {
        fx.manager.ingest_dialogue_turn("a", "u", &i.to_string()).await.unwrap();
        fx.manager.ingest_dialogue_turn("b", "u", &i.to_string()).await.unwrap();
    }
    assert_eq!(fx.provider.call_count().await, 0);
    fx.manager.ingest_dialogue_turn("a", "u", "5").await.unwrap();
    assert_eq!(fx.provider.call_count().await, 1);
}

#[tokio::test]
async fn cleared_knowledge_returns_nothing() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &lines(&["a", "b"])).await.unwrap();
    fx.manager.clear_category("g1", Category::Knowledge).await.unwrap();

    let hits = fx.manager.retrieve("g1", Category::Knowledge, "a", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn clearing_dialogue_resets_cache_counter_and_index() {
    let fx = Fixture::with_responses(vec!["- 事實"]);
    for i in 0..5 {
        fx.manager.ingest_dialogue_turn("g1", "u", &i.to_string()).await.unwrap();
    }
    fx.manager.ingest_dialogue_turn("g1", "u", "after").await.unwrap();
    fx.manager.clear_category("g1", Category::Dialogue).await.unwrap();

    assert!(fx.manager.current_cache_snapshot("g1").is_empty());
    assert!(fx.manager.store().dump_all("g1", Category::Dialogue).await.unwrap().is_empty());

    for i in 0..4 {
        let report = fx.manager.ingest_dialogue_turn("g1", "u", &i.to_string()).await.unwrap();
        assert_eq!(report.turn, i + 1);
    }
    assert_eq!(fx.provider.call_count().await, 1);
}

#[tokio::test]
async fn load_or_create_is_idempotent() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &lines(&["x", "y"])).await.unwrap();

    let restarted = fx.restarted();
    let first = restarted.store().load_or_create("g1", Category::Knowledge).await.unwrap();
    let second = restarted.store().load_or_create("g1", Category::Knowledge).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn knowledge_survives_restart() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &lines(&["持久的知識"])).await.unwrap();

    let hits = fx
        .restarted()
        .retrieve("g1", Category::Knowledge, "持久的知識", 1)
        .await
        .unwrap();
    assert_eq!(hits[0].content, "持久的知識");
}

#[tokio::test]
async fn cache_is_not_persisted() {
    let fx = Fixture::new();
    fx.manager.ingest_dialogue_turn("g1", "u", "hello").await.unwrap();
    assert_eq!(fx.manager.current_cache_snapshot("g1").len(), 1);
    assert!(fx.restarted().current_cache_snapshot("g1").is_empty());
}

#[tokio::test]
async fn failed_upload_is_reported() {
    let fx = Fixture::new();
    fx.embedder.set_failing(true);
    let err = fx.manager.ingest_document("g1", &lines(&["x"])).await.unwrap_err();
    assert!(matches!(err, GroupmindError::Embedding { .. }));
}

#[tokio::test]
async fn embedding_failure_during_pass_does_not_fail_turn() {
    let fx = Fixture::with_responses(vec!["- 事實"]);
    fx.embedder.set_failing(true);
    let mut last = None;
    for i in 0..5 {
        last = Some(fx.manager.ingest_dialogue_turn("g1", "u", &i.to_string()).await);
    }
    let report = last.unwrap().expect("turn must succeed");
    assert!(report.summarized);
    assert_eq!(report.facts_committed, 0);
}

#[tokio::test]
async fn export_writes_one_document_per_line() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &split_paragraphs("甲\n\n乙\n")).await.unwrap();

    let outcome = fx.manager.export_category("g1", Category::Knowledge).await.unwrap();
    let ExportOutcome::Written { path, count } = outcome else {
        panic!("expected a written export, got {outcome:?}");
    };
    assert_eq!(count, 2);
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("g1_knowledge_") && name.ends_with(".txt"), "name: {name}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "甲\n乙\n");
}

#[tokio::test]
async fn back_to_back_exports_keep_both_files() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &lines(&["a"])).await.unwrap();

    let mut paths = Vec::new();
    for _ in 0..3 {
        match fx.manager.export_category("g1", Category::Knowledge).await.unwrap() {
            ExportOutcome::Written { path, .. } => paths.push(path),
            other => panic!("expected a written export, got {other:?}"),
        }
    }
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 3);
    for path in &paths {
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a\n");
    }
}

#[tokio::test]
async fn export_of_empty_index_writes_nothing() {
    let fx = Fixture::new();
    let outcome = fx.manager.export_category("g1", Category::Dialogue).await.unwrap();
    assert_eq!(outcome, ExportOutcome::Empty);
    assert!(!Path::new(&fx.config.export_dir).exists());
}

#[tokio::test]
async fn recall_queries_both_categories_with_cache_text() {
    let fx = Fixture::with_responses(vec!["- 昭昭喜歡貓"]);
    fx.manager.ingest_document("g1", &lines(&["昭昭：生日6/23"])).await.unwrap();
    for text in ["昭昭生日快到了", "對啊", "要送什麼", "她喜歡貓", "那送貓玩具"] {
        fx.manager.ingest_dialogue_turn("g1", "小明", text).await.unwrap();
    }

    let recall = fx.manager.recall("g1").await.unwrap();
    assert!(recall.cache_text.starts_with("小明說：「昭昭生日快到了」\n"));
    assert_eq!(recall.knowledge, ["昭昭：生日6/23"]);
    assert_eq!(recall.dialogue.len(), 1);
    assert!(recall.dialogue[0].starts_with("昭昭喜歡貓（"));
}

#[tokio::test]
async fn empty_cache_recall_retrieves_nothing_without_embedding() {
    let fx = Fixture::new();
    fx.manager.ingest_document("g1", &lines(&["a"])).await.unwrap();
    let calls = fx.embedder.call_count();

    let recall = fx.manager.recall("g1").await.unwrap();
    assert!(recall.cache_text.is_empty());
    assert!(recall.knowledge.is_empty());
    assert!(recall.dialogue.is_empty());
    assert_eq!(fx.embedder.call_count(), calls);
}

#[tokio::test]
async fn concurrent_turns_fire_exactly_once_per_boundary() {
    let fx = Arc::new(Fixture::new());
    let mut handles = Vec::new();
    for i in 0..20 {
        let fx = Arc::clone(&fx);
        handles.push(tokio::spawn(async move {
            fx.manager
                .ingest_dialogue_turn("g1", "u", &i.to_string())
                .await
                .unwrap()
        }));
    }
    let mut summarized = 0;
    for h in handles {
        if h.await.unwrap().summarized {
            summarized += 1;
        }
    }
    assert_eq!(summarized, 4);
    assert_eq!(fx.provider.call_count().await, 4);
}

#[tokio::test]
async fn invalid_group_is_rejected() {
    let fx = Fixture::new();
    let err = fx.manager.ingest_dialogue_turn("a/b", "u", "x").await.unwrap_err();
    assert!(matches!(err, GroupmindError::Validation(_)));
}
