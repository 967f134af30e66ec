// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group chat memory for Groupmind.
//!
//! Each group gets a bounded recency cache of recent messages and two
//! persisted vector indices: `knowledge` for uploaded documents and
//! `dialogue` for facts an LLM extracts from the cache every few turns.
//! [`MemoryManager`] is the entry point.

pub mod cache;
pub mod extractor;
pub mod index;
pub mod manager;
pub mod store;
pub mod types;

pub use cache::{RecencyCache, TurnRecord};
pub use extractor::FactExtractor;
pub use index::{IndexError, VectorIndex};
pub use manager::{split_paragraphs, ExportOutcome, MemoryManager, RecallContext, TurnReport};
pub use store::IndexStore;
pub use types::{CacheEntry, Category, SearchHit};
