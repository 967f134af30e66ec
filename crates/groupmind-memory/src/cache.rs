// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-group bounded recency cache and dialogue turn counter.
//!
//! Each group's buffer and counter live in one `DashMap` entry, so a
//! mutation holds that entry's shard lock and never interleaves with
//! another mutation of the same group. Groups in different shards proceed
//! in parallel.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::types::CacheEntry;

#[derive(Debug, Default)]
struct GroupState {
    entries: VecDeque<CacheEntry>,
    turns: u64,
}

/// Result of recording one dialogue turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    /// Turn count after this turn, starting at 1.
    pub turn: u64,
    /// Cache contents taken under the same lock as the append, present only
    /// when this turn is a summarization boundary.
    pub summary_snapshot: Option<Vec<CacheEntry>>,
}

/// Bounded FIFO message buffers keyed by group, created on first use.
#[derive(Debug)]
pub struct RecencyCache {
    capacity: usize,
    groups: DashMap<String, GroupState>,
}

impl RecencyCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            groups: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, state: &mut GroupState, entry: CacheEntry) {
        while state.entries.len() >= self.capacity {
            state.entries.pop_front();
        }
        state.entries.push_back(entry);
    }

    /// Appends a message, evicting the oldest when full. Does not count a turn.
    pub fn append(&self, group: &str, entry: CacheEntry) {
        let mut state = self.groups.entry(group.to_string()).or_default();
        self.push(&mut state, entry);
    }

    /// Appends a message and counts it as a dialogue turn. Every
    /// `interval`-th turn (the `interval`-th, `2*interval`-th, ...) carries a
    /// snapshot for summarization.
    pub fn record_turn(&self, group: &str, entry: CacheEntry, interval: u64) -> TurnRecord {
        let mut state = self.groups.entry(group.to_string()).or_default();
        self.push(&mut state, entry);
        state.turns += 1;

        let fires = interval > 0 && state.turns % interval == 0;
        TurnRecord {
            turn: state.turns,
            summary_snapshot: fires.then(|| state.entries.iter().cloned().collect()),
        }
    }

    /// Current buffer contents, oldest first.
    pub fn snapshot(&self, group: &str) -> Vec<CacheEntry> {
        self.groups
            .get(group)
            .map(|state| state.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Turns recorded since the last clear.
    pub fn turns(&self, group: &str) -> u64 {
        self.groups.get(group).map(|state| state.turns).unwrap_or(0)
    }

    /// Empties the buffer and resets the turn counter.
    pub fn clear(&self, group: &str) {
        self.groups.remove(group);
    }
}
