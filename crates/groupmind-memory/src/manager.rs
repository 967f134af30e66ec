// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory manager: the single entry point over cache, extractor and indices.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use groupmind_config::MemoryConfig;
use groupmind_core::traits::{EmbeddingAdapter, ProviderAdapter};
use groupmind_core::GroupmindError;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::RecencyCache;
use crate::extractor::{stamp_facts, FactExtractor};
use crate::store::IndexStore;
use crate::types::{validate_group, CacheEntry, Category, SearchHit};

/// Outcome of [`MemoryManager::ingest_dialogue_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// Turn count for the group after this turn.
    pub turn: u64,
    /// Whether this turn was a summarization boundary.
    pub summarized: bool,
    /// Facts written to the dialogue index by this turn's pass.
    pub facts_committed: usize,
}

/// Outcome of [`MemoryManager::export_category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, count: usize },
    /// The index holds no documents; no file was written.
    Empty,
}

/// Retrieval context for generating a reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallContext {
    /// The cache as `user說：「text」` lines; also the retrieval query.
    pub cache_text: String,
    pub knowledge: Vec<String>,
    pub dialogue: Vec<String>,
}

impl RecallContext {
    /// The three blocks as prompt text.
    pub fn render(&self) -> String {
        fn block(lines: &[String]) -> String {
            if lines.is_empty() {
                "（無）".to_string()
            } else {
                lines.join("\n")
            }
        }
        let cache = if self.cache_text.is_empty() {
            "（無）"
        } else {
            self.cache_text.as_str()
        };
        format!(
            "【群組知識】\n{}\n\n【對話記憶】\n{}\n\n【最近對話】\n{}",
            block(&self.knowledge),
            block(&self.dialogue),
            cache
        )
    }
}

/// Splits an uploaded document into trimmed, non-empty lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Creates `<dir>/<stem>.txt`, or the first free `<stem>_<n>.txt`.
async fn create_unique(dir: &Path, stem: &str) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let mut attempt = 1u32;
    loop {
        let name = if attempt == 1 {
            format!("{stem}.txt")
        } else {
            format!("{stem}_{attempt}.txt")
        };
        let path = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Coordinates the recency cache, the summarization pass and the vector
/// indices for every group.
pub struct MemoryManager {
    cache: RecencyCache,
    store: IndexStore,
    extractor: FactExtractor,
    summary_interval: u64,
    retrieval_k: usize,
    export_dir: PathBuf,
}

impl MemoryManager {
    pub fn new(
        config: &MemoryConfig,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Self {
        info!(
            data_dir = %config.data_dir,
            cache_capacity = config.cache_capacity,
            summary_interval = config.summary_interval,
            "memory manager initialized"
        );
        Self {
            cache: RecencyCache::new(config.cache_capacity),
            store: IndexStore::new(&config.data_dir, embedder, &config.probe_text),
            extractor: FactExtractor::new(provider, &config.extraction_model),
            summary_interval: config.summary_interval.max(1),
            retrieval_k: config.retrieval_k,
            export_dir: PathBuf::from(&config.export_dir),
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn retrieval_k(&self) -> usize {
        self.retrieval_k
    }

    /// Embeds and stores uploaded paragraphs in the group's knowledge index.
    pub async fn ingest_document(
        &self,
        group: &str,
        paragraphs: &[String],
    ) -> Result<usize, GroupmindError> {
        self.store
            .add_texts(group, Category::Knowledge, paragraphs)
            .await
    }

    /// Records a message and, on every `summary_interval`-th turn, runs a
    /// summarization pass. A failed pass is logged and does not fail the turn.
    pub async fn ingest_dialogue_turn(
        &self,
        group: &str,
        user: &str,
        text: &str,
    ) -> Result<TurnReport, GroupmindError> {
        validate_group(group)?;
        let record = self
            .cache
            .record_turn(group, CacheEntry::new(user, text), self.summary_interval);
        debug!(group, turn = record.turn, "dialogue turn recorded");

        let Some(snapshot) = record.summary_snapshot else {
            return Ok(TurnReport {
                turn: record.turn,
                summarized: false,
                facts_committed: 0,
            });
        };

        let facts_committed = match self.summarize(group, &snapshot).await {
            Ok(count) => {
                info!(group, turn = record.turn, count, "summarization pass committed facts");
                count
            }
            Err(e) => {
                warn!(group, turn = record.turn, error = %e, "summarization pass failed, skipping");
                0
            }
        };

        Ok(TurnReport {
            turn: record.turn,
            summarized: true,
            facts_committed,
        })
    }

    async fn summarize(&self, group: &str, snapshot: &[CacheEntry]) -> Result<usize, GroupmindError> {
        let facts = self.extractor.extract(snapshot).await?;
        if facts.is_empty() {
            return Ok(0);
        }
        let stamped = stamp_facts(&facts, Local::now());
        self.store.add_texts(group, Category::Dialogue, &stamped).await
    }

    /// Up to `k` stored documents nearest to `query_text`.
    pub async fn retrieve(
        &self,
        group: &str,
        category: Category,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, GroupmindError> {
        self.store.query(group, category, query_text, k).await
    }

    /// The group's cached messages, oldest first.
    pub fn current_cache_snapshot(&self, group: &str) -> Vec<CacheEntry> {
        self.cache.snapshot(group)
    }

    /// Clears one category of a group's memory.
    ///
    /// `Dialogue` empties the recency cache, resets the turn counter and
    /// deletes the dialogue index. `Knowledge` deletes the knowledge index.
    pub async fn clear_category(&self, group: &str, category: Category) -> Result<(), GroupmindError> {
        validate_group(group)?;
        if category == Category::Dialogue {
            self.cache.clear(group);
        }
        self.store.clear(group, category).await
    }

    /// Writes every document of the index to
    /// `<export_dir>/<group>_<category>_<YYYYmmdd_HHMMSS>.txt`, one per line.
    /// An existing file is never replaced; a later export in the same second
    /// gets a `_2`, `_3`, ... suffix.
    pub async fn export_category(
        &self,
        group: &str,
        category: Category,
    ) -> Result<ExportOutcome, GroupmindError> {
        let documents = self.store.dump_all(group, category).await?;
        if documents.is_empty() {
            return Ok(ExportOutcome::Empty);
        }

        tokio::fs::create_dir_all(&self.export_dir).await?;
        let stem = format!(
            "{group}_{category}_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let (path, mut file) = create_unique(&self.export_dir, &stem).await?;
        let mut body = documents.join("\n");
        body.push('\n');
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;

        info!(group, category = %category, path = %path.display(), count = documents.len(), "exported index");
        Ok(ExportOutcome::Written {
            path,
            count: documents.len(),
        })
    }

    /// Renders the cache and retrieves supporting knowledge and dialogue
    /// documents using it as the query.
    pub async fn recall(&self, group: &str) -> Result<RecallContext, GroupmindError> {
        validate_group(group)?;
        let cache_text = self
            .cache
            .snapshot(group)
            .iter()
            .map(CacheEntry::recall_line)
            .collect::<Vec<_>>()
            .join("\n");

        let knowledge = self
            .retrieve(group, Category::Knowledge, &cache_text, self.retrieval_k)
            .await?;
        let dialogue = self
            .retrieve(group, Category::Dialogue, &cache_text, self.retrieval_k)
            .await?;

        Ok(RecallContext {
            cache_text,
            knowledge: knowledge.into_iter().map(|h| h.content).collect(),
            dialogue: dialogue.into_iter().map(|h| h.content).collect(),
        })
    }
}
