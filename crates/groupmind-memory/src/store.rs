// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted vector indices, one per (group, category).
//!
//! Indices live under `<root>/<group>/<category>/`. Each (group, category)
//! has its own async mutex, so load, add and persist for one index run one
//! at a time while other indices proceed in parallel.
//!
//! A loaded index is cached together with the size and modification time of
//! its manifest. Every access compares that stamp with the file on disk and
//! reloads when another process has written or cleared the index since.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use groupmind_core::traits::EmbeddingAdapter;
use groupmind_core::types::EmbeddingInput;
use groupmind_core::GroupmindError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::index::{IndexError, VectorIndex, MANIFEST_FILE};
use crate::types::{validate_group, Category, SearchHit};

/// Identifies one version of a persisted manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DiskStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl DiskStamp {
    /// `None` when no index is persisted in `dir`.
    async fn read(dir: &Path) -> Option<Self> {
        let meta = tokio::fs::metadata(dir.join(MANIFEST_FILE)).await.ok()?;
        meta.is_file().then(|| Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// An index held in memory. `stamp` is `None` for an index that has not
/// been written yet.
struct Cached {
    index: VectorIndex,
    stamp: Option<DiskStamp>,
}

type SlotKey = (String, Category);
type Slot = Arc<Mutex<Option<Cached>>>;

/// Owns every vector index below one root directory.
pub struct IndexStore {
    root: PathBuf,
    embedder: Arc<dyn EmbeddingAdapter>,
    probe_text: String,
    slots: DashMap<SlotKey, Slot>,
}

impl IndexStore {
    pub fn new(
        root: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingAdapter>,
        probe_text: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            embedder,
            probe_text: probe_text.into(),
            slots: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the index for (group, category).
    pub fn index_dir(&self, group: &str, category: Category) -> PathBuf {
        self.root.join(group).join(category.as_str())
    }

    /// Number of (group, category) pairs with a slot in memory.
    pub fn tracked_indices(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, key: &SlotKey) -> Slot {
        self.slots.entry(key.clone()).or_default().clone()
    }

    /// Drops the map entry for `key` when the caller holds the only other
    /// reference to `slot`. Call with the slot's lock held.
    fn release(&self, key: &SlotKey, slot: &Slot) {
        self.slots
            .remove_if(key, |_, current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
    }

    /// Embeds `texts`, checking the provider returned one vector per text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, GroupmindError> {
        let expected = texts.len();
        let output = self.embedder.embed(EmbeddingInput { texts }).await?;
        if output.embeddings.len() != expected {
            return Err(GroupmindError::embedding(format!(
                "expected {expected} embeddings, got {}",
                output.embeddings.len()
            )));
        }
        Ok(output.embeddings)
    }

    /// Dimension reported by the provider for the probe text.
    async fn probe_dimension(&self) -> Result<usize, GroupmindError> {
        let vectors = self.embed(vec![self.probe_text.clone()]).await?;
        match vectors.first().map(Vec::len) {
            Some(d) if d > 0 => Ok(d),
            _ => Err(GroupmindError::embedding("probe returned an empty vector")),
        }
    }

    /// Brings the slot in line with the disk: reloads when the manifest
    /// changed since it was cached and empties the slot when the persisted
    /// index is gone. An unsaved index is kept while nothing is on disk.
    async fn refresh(&self, slot: &mut Option<Cached>, dir: &Path) -> Result<(), GroupmindError> {
        let on_disk = DiskStamp::read(dir).await;
        if slot.as_ref().is_some_and(|cached| cached.stamp == on_disk) {
            return Ok(());
        }

        *slot = None;
        if let Some(stamp) = on_disk {
            let load_dir = dir.to_path_buf();
            let index = tokio::task::spawn_blocking(move || VectorIndex::load(&load_dir))
                .await
                .map_err(|e| GroupmindError::Internal(format!("index load task failed: {e}")))??;
            debug!(dir = %dir.display(), documents = index.len(), "loaded vector index");
            *slot = Some(Cached {
                index,
                stamp: Some(stamp),
            });
        }
        Ok(())
    }

    /// Refreshes the slot, then fills it with a new empty index of the
    /// provider's dimension when nothing is persisted yet.
    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<Cached>,
        dir: &Path,
    ) -> Result<&'a mut VectorIndex, GroupmindError> {
        self.refresh(slot, dir).await?;
        if slot.is_none() {
            let dimension = self.probe_dimension().await?;
            debug!(dir = %dir.display(), dimension, "created empty vector index");
            *slot = Some(Cached {
                index: VectorIndex::new(dimension),
                stamp: None,
            });
        }
        slot.as_mut()
            .map(|cached| &mut cached.index)
            .ok_or_else(|| GroupmindError::Internal("index slot empty after load".into()))
    }

    /// Returns a copy of the index for (group, category), loading it from
    /// disk or creating an empty one. Creating does not write anything.
    pub async fn load_or_create(
        &self,
        group: &str,
        category: Category,
    ) -> Result<VectorIndex, GroupmindError> {
        validate_group(group)?;
        let dir = self.index_dir(group, category);
        let slot = self.slot(&(group.to_string(), category));
        let mut guard = slot.lock().await;
        Ok(self.ensure_loaded(&mut guard, &dir).await?.clone())
    }

    /// Embeds and appends `texts`, then persists the whole index.
    ///
    /// Nothing is written when embedding fails or the vectors do not match
    /// the index dimension. When persisting fails the in-memory index is
    /// dropped so the next access reloads what is on disk.
    pub async fn add_texts(
        &self,
        group: &str,
        category: Category,
        texts: &[String],
    ) -> Result<usize, GroupmindError> {
        validate_group(group)?;
        if texts.is_empty() {
            return Ok(0);
        }

        let dir = self.index_dir(group, category);
        let slot = self.slot(&(group.to_string(), category));
        let mut guard = slot.lock().await;
        let dimension = self.ensure_loaded(&mut guard, &dir).await?.dimension();

        let vectors = self.embed(texts.to_vec()).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }
            .into());
        }

        let Some(Cached { mut index, .. }) = guard.take() else {
            return Err(GroupmindError::Internal("index slot empty after load".into()));
        };
        for (text, vector) in texts.iter().zip(&vectors) {
            index.add(text.clone(), vector)?;
        }

        let save_dir = dir.clone();
        let (index, saved) = tokio::task::spawn_blocking(move || {
            let result = index.save(&save_dir);
            (index, result)
        })
        .await
        .map_err(|e| GroupmindError::Internal(format!("index save task failed: {e}")))?;

        match saved {
            Ok(()) => {
                info!(
                    group,
                    category = %category,
                    added = texts.len(),
                    total = index.len(),
                    "vector index updated"
                );
                let stamp = DiskStamp::read(&dir).await;
                *guard = Some(Cached { index, stamp });
                Ok(texts.len())
            }
            Err(e) => {
                warn!(group, category = %category, error = %e, "failed to persist vector index");
                Err(e.into())
            }
        }
    }

    /// Up to `k` documents nearest to `query_text`.
    ///
    /// A blank query, or an index with no documents, persisted or not,
    /// yields an empty result without calling the embedding provider.
    pub async fn query(
        &self,
        group: &str,
        category: Category,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, GroupmindError> {
        validate_group(group)?;
        if k == 0 || query_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let key = (group.to_string(), category);
        let dir = self.index_dir(group, category);
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        self.refresh(&mut guard, &dir).await?;
        let Some(cached) = guard.as_ref() else {
            self.release(&key, &slot);
            return Ok(Vec::new());
        };
        if cached.index.is_empty() {
            return Ok(Vec::new());
        }

        let query = self
            .embed(vec![query_text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GroupmindError::embedding("no embedding returned for query"))?;
        Ok(cached.index.search(&query, k)?)
    }

    /// Every stored document's text in insertion order.
    pub async fn dump_all(
        &self,
        group: &str,
        category: Category,
    ) -> Result<Vec<String>, GroupmindError> {
        validate_group(group)?;
        let key = (group.to_string(), category);
        let dir = self.index_dir(group, category);
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        self.refresh(&mut guard, &dir).await?;
        let Some(cached) = guard.as_ref() else {
            self.release(&key, &slot);
            return Ok(Vec::new());
        };
        Ok(cached
            .index
            .documents()
            .iter()
            .map(|d| d.content.clone())
            .collect())
    }

    /// Deletes the persisted files and the in-memory index for (group, category).
    pub async fn clear(&self, group: &str, category: Category) -> Result<(), GroupmindError> {
        validate_group(group)?;
        let key = (group.to_string(), category);
        let dir = self.index_dir(group, category);
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        *guard = None;

        let removed: Result<(), GroupmindError> = match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(group, category = %category, "vector index cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndexError::Io { path: dir, source: e }.into()),
        };
        self.release(&key, &slot);
        removed
    }
}
