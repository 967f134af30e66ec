// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter for tests.
//!
//! Each text is hashed into a bag of character unigrams and bigrams over a
//! fixed number of buckets, then L2-normalized. Identical texts always map
//! to identical vectors and texts sharing characters land close together,
//! which is enough for nearest-neighbour assertions without a real model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use groupmind_core::traits::adapter::PluginAdapter;
use groupmind_core::traits::embedding::EmbeddingAdapter;
use groupmind_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput};
use groupmind_core::GroupmindError;

pub const DEFAULT_DIMENSION: usize = 64;

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicUsize,
    texts: AtomicUsize,
    failing: AtomicBool,
}

/// Hashing embedder with call counters and a switchable failure mode.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
    counters: Arc<Counters>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Makes every subsequent `embed` call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.counters.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls, including failed ones.
    pub fn call_count(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts successfully embedded.
    pub fn texts_embedded(&self) -> usize {
        self.counters.texts.load(Ordering::SeqCst)
    }

    /// The vector `embed` would return for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let chars: Vec<char> = text.chars().collect();

        for c in &chars {
            v[bucket(&[*c], self.dimension)] += 1.0;
        }
        for pair in chars.windows(2) {
            v[bucket(pair, self.dimension)] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a over the UTF-8 bytes of `gram`.
fn bucket(gram: &[char], dimension: usize) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut buf = [0u8; 4];
    for c in gram {
        for b in c.encode_utf8(&mut buf).bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    (hash % dimension as u64) as usize
}

impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, GroupmindError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if self.counters.failing.load(Ordering::SeqCst) {
            return Err(GroupmindError::embedding("mock embedder is failing"));
        }

        self.counters
            .texts
            .fetch_add(input.texts.len(), Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimension,
        })
    }
}
