// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat L2 vector index and its on-disk format.
//!
//! An index directory holds two files:
//!
//! - `index.json`: format version, dimension, and the documents (id + text)
//!   in insertion order.
//! - `vectors.bin`: the vectors for those documents, concatenated as
//!   little-endian `f32`, `dimension` floats per document.
//!
//! Both files are written to a temporary name and renamed into place,
//! vectors first. Documents are only ever appended, so a save interrupted
//! between the two renames leaves extra trailing rows in `vectors.bin`.
//! The manifest is authoritative and `load` ignores rows past it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use groupmind_core::GroupmindError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::types::{blob_to_vec, l2_distance_squared, vec_to_blob, SearchHit};

pub const MANIFEST_FILE: &str = "index.json";
pub const VECTORS_FILE: &str = "vectors.bin";
const FORMAT_VERSION: u32 = 1;

/// Failures reading, writing or using a vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index I/O failed at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("index manifest is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index is corrupt: {0}")]
    Corrupt(String),
}

impl From<IndexError> for GroupmindError {
    fn from(err: IndexError) -> Self {
        GroupmindError::storage(err)
    }
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> IndexError + '_ {
    move |source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u32,
    dimension: usize,
    documents: Vec<Document>,
}

/// Exhaustive nearest-neighbour index over squared Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    documents: Vec<Document>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// An empty index whose vectors must all have `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            documents: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Appends a document under a fresh id.
    pub fn add(&mut self, content: String, vector: &[f32]) -> Result<&Document, IndexError> {
        self.check_dimension(vector.len())?;
        self.vectors.extend_from_slice(vector);
        self.documents.push(Document {
            id: Uuid::new_v4().to_string(),
            content,
        });
        Ok(&self.documents[self.documents.len() - 1])
    }

    /// Up to `k` documents by ascending distance to `query`. Ties keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.check_dimension(query.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|v| l2_distance_squared(query, v))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| SearchHit {
                content: self.documents[i].content.clone(),
                distance,
            })
            .collect())
    }

    /// True when `dir` holds a persisted index.
    pub fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let vectors_path = dir.join(VECTORS_FILE);

        let raw = fs::read(&manifest_path).map_err(io_at(&manifest_path))?;
        let manifest: Manifest = serde_json::from_slice(&raw)?;
        if manifest.version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                manifest.version
            )));
        }
        if manifest.dimension == 0 {
            return Err(IndexError::Corrupt("dimension is zero".into()));
        }

        let blob = fs::read(&vectors_path).map_err(io_at(&vectors_path))?;
        let expected_bytes = manifest.documents.len() * manifest.dimension * 4;
        if blob.len() < expected_bytes {
            return Err(IndexError::Corrupt(format!(
                "{VECTORS_FILE} holds {} bytes, expected {expected_bytes} for {} documents",
                blob.len(),
                manifest.documents.len()
            )));
        }
        if blob.len() > expected_bytes {
            warn!(
                dir = %dir.display(),
                stale_bytes = blob.len() - expected_bytes,
                "ignoring vectors past the manifest"
            );
        }

        Ok(Self {
            dimension: manifest.dimension,
            documents: manifest.documents,
            vectors: blob_to_vec(&blob[..expected_bytes]),
        })
    }

    /// Writes the whole index under `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir).map_err(io_at(dir))?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            documents: self.documents.clone(),
        };
        let json = serde_json::to_vec_pretty(&manifest)?;

        // Vectors first: a failure between the renames leaves only unreferenced
        // trailing rows, never a manifest pointing past the vector file.
        write_atomic(&dir.join(VECTORS_FILE), &vec_to_blob(&self.vectors))?;
        write_atomic(&dir.join(MANIFEST_FILE), &json)?;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(io_at(&tmp))?;
    fs::rename(&tmp, path).map_err(io_at(path))
}
