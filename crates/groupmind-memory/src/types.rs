// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types.

use chrono::{DateTime, Local};
use groupmind_core::GroupmindError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Partition of a group's vector storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Facts from uploaded reference documents.
    Knowledge,
    /// Facts distilled from the group's conversation.
    Dialogue,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Knowledge, Category::Dialogue];

    /// Directory name and wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Knowledge => "knowledge",
            Category::Dialogue => "dialogue",
        }
    }

    /// Parses a category tag, rejecting anything outside the closed set.
    pub fn from_tag(tag: &str) -> Result<Self, GroupmindError> {
        tag.trim().parse().map_err(|_| {
            GroupmindError::Validation(format!(
                "unknown category `{tag}` (expected `knowledge` or `dialogue`)"
            ))
        })
    }
}

/// One message held by a group's recency cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub user: String,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl CacheEntry {
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(user, text, Local::now())
    }

    pub fn at(user: impl Into<String>, text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// `user：text`, the form fed to fact extraction.
    pub fn summary_line(&self) -> String {
        format!("{}：{}", self.user, self.text)
    }

    /// `user說：「text」`, the form used as a retrieval query.
    pub fn recall_line(&self) -> String {
        format!("{}說：「{}」", self.user, self.text)
    }
}

/// A document returned by a similarity search, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

/// Rejects group ids that cannot safely name a directory.
pub fn validate_group(group: &str) -> Result<(), GroupmindError> {
    let bad = group.is_empty()
        || group == "."
        || group == ".."
        || group.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
    if bad {
        return Err(GroupmindError::Validation(format!(
            "invalid group id `{group}`"
        )));
    }
    Ok(())
}

/// Convert an f32 vector to little-endian bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to an f32 vector. Trailing bytes that do
/// not form a whole float are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Squared Euclidean distance.
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(Category::from_tag("knowledge").unwrap(), Category::Knowledge);
        assert_eq!(Category::from_tag("Dialogue").unwrap(), Category::Dialogue);
        assert_eq!(Category::from_tag(" KNOWLEDGE ").unwrap(), Category::Knowledge);
    }

    #[test]
    fn unknown_category_is_validation_error() {
        let err = Category::from_tag("notes").unwrap_err();
        assert!(matches!(err, GroupmindError::Validation(ref m) if m.contains("notes")));
    }

    #[test]
    fn category_display_matches_tag() {
        for c in Category::ALL {
            assert_eq!(c.to_string(), c.as_str());
        }
    }

    #[test]
    fn cache_entry_renderings() {
        let e = CacheEntry::new("小明", "明天見");
        assert_eq!(e.summary_line(), "小明：明天見");
        assert_eq!(e.recall_line(), "小明說：「明天見」");
    }

    #[test]
    fn group_ids_that_escape_the_root_are_rejected() {
        assert!(validate_group("C1234567890abcdef").is_ok());
        assert!(validate_group("").is_err());
        assert!(validate_group("..").is_err());
        assert!(validate_group("a/b").is_err());
    }

    #[test]
    fn blob_round_trip() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
    }

    #[test]
    fn l2_of_identical_vectors_is_zero() {
        assert_eq!(l2_distance_squared(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(l2_distance_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }
}
