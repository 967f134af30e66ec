// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from the recency cache.
//!
//! The cache is rendered as `user：text` lines, sent to the extraction model
//! with a fixed instruction, and the bullet list it answers with is parsed
//! into one fact per line. Each fact is stamped with the time of the pass
//! before it is stored in the group's dialogue index.

use std::sync::Arc;

use chrono::{DateTime, Local};
use groupmind_core::traits::ProviderAdapter;
use groupmind_core::types::{ProviderMessage, ProviderRequest};
use groupmind_core::GroupmindError;
use tracing::debug;

use crate::types::CacheEntry;

/// System prompt for the extraction model.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "你是一個會提取知識點的筆記小幫手。";

const EXTRACTION_PROMPT: &str = "請從以下對話中，提取可能值得記錄的知識點，以條列式列出。例如：
- 小明的生日是6月23日
- 小美將於週五搬宿舍
- 林大恩的綽號是呆呆
如果沒有就回答「無」。

對話如下：
{conversation}";

/// Answers meaning "nothing worth recording".
const NOTHING_FOUND: &[&str] = &["無", "无", "none", "nothing"];

const EXTRACTION_MAX_TOKENS: u32 = 1024;

/// Calls the extraction model and turns its answer into facts.
pub struct FactExtractor {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Facts found in `entries`, without timestamps. An empty result means
    /// the model answered that there was nothing to record.
    pub async fn extract(&self, entries: &[CacheEntry]) -> Result<Vec<String>, GroupmindError> {
        let prompt = EXTRACTION_PROMPT.replace("{conversation}", &build_summary_context(entries));
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(EXTRACTION_SYSTEM_PROMPT.to_string()),
            messages: vec![ProviderMessage::user(prompt)],
            max_tokens: EXTRACTION_MAX_TOKENS,
        };

        let response = self.provider.complete(request).await?;
        debug!(model = %self.model, chars = response.content.len(), "extraction response received");
        parse_facts(&response.content)
    }
}

/// Newline-joined `user：text` lines, oldest first.
pub fn build_summary_context(entries: &[CacheEntry]) -> String {
    entries
        .iter()
        .map(CacheEntry::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_closing_punctuation(c: char) -> bool {
    matches!(
        c,
        '。' | '.' | '!' | '！' | '?' | '？' | '」' | '"' | '\'' | '”' | '』'
    ) || c.is_whitespace()
}

fn is_opening_quote(c: char) -> bool {
    matches!(c, '「' | '"' | '\'' | '“' | '『') || c.is_whitespace()
}

/// True when `text`, ignoring quotes and trailing punctuation, is a
/// "nothing found" answer.
fn is_nothing_found(text: &str) -> bool {
    let core = text
        .trim_end_matches(is_closing_punctuation)
        .trim_start_matches(is_opening_quote);
    NOTHING_FOUND.iter().any(|s| core.eq_ignore_ascii_case(s))
}

/// Removes a leading `-`, `*`, `•`, `・` or `1.` / `1)` / `1、` marker.
fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for marker in ['-', '*', '•', '・', '‧', '·'] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        for sep in ['.', ')', '、', '）'] {
            if let Some(after) = rest.strip_prefix(sep) {
                // "3.5倍" is a number, not a list marker.
                if !after.starts_with(|c: char| c.is_ascii_digit()) {
                    return after.trim_start();
                }
            }
        }
    }
    line
}

/// Parses the model's answer into one fact per non-empty line.
///
/// A whole-response "nothing found" answer gives `Ok(vec![])`; a blank
/// response is an [`GroupmindError::Extraction`] error.
pub fn parse_facts(response: &str) -> Result<Vec<String>, GroupmindError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(GroupmindError::Extraction("empty extraction response".into()));
    }
    if is_nothing_found(trimmed) {
        return Ok(Vec::new());
    }

    Ok(trimmed
        .lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty() && !is_nothing_found(line))
        .map(str::to_string)
        .collect())
}

/// Appends `（YYYY-MM-DD HH:MM:SS）` to each fact.
pub fn stamp_facts(facts: &[String], at: DateTime<Local>) -> Vec<String> {
    let stamp = at.format("%Y-%m-%d %H:%M:%S");
    facts.iter().map(|fact| format!("{fact}（{stamp}）")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use groupmind_test_utils::MockProvider;

    #[test]
    fn summary_context_uses_fullwidth_colon() {
        let entries = vec![CacheEntry::new("小明", "我生日是6/23"), CacheEntry::new("小美", "記住了")];
        assert_eq!(build_summary_context(&entries), "小明：我生日是6/23\n小美：記住了");
    }

    #[test]
    fn bullet_list_is_parsed() {
        let facts = parse_facts("- 小明的生日是6月23日\n* 小美週五搬宿舍\n\n• 林大恩的綽號是呆呆\n").unwrap();
        assert_eq!(facts, ["小明的生日是6月23日", "小美週五搬宿舍", "林大恩的綽號是呆呆"]);
    }

    #[test]
    fn numbered_list_is_parsed_but_decimals_survive() {
        let facts = parse_facts("1. 第一點\n2、第二點\n3.5倍的價格").unwrap();
        assert_eq!(facts, ["第一點", "第二點", "3.5倍的價格"]);
    }

    #[test]
    fn nothing_found_variants() {
        for answer in ["無", "無。", "「無」", "None", "none.", "  無  "] {
            assert!(parse_facts(answer).unwrap().is_empty(), "answer {answer:?}");
        }
    }

    #[test]
    fn fact_without_trailing_punctuation_is_not_truncated() {
        assert_eq!(parse_facts("- 測試事實").unwrap(), ["測試事實"]);
    }

    #[test]
    fn fact_containing_sentinel_word_is_kept() {
        assert_eq!(parse_facts("- 無糖可樂是小明的最愛").unwrap(), ["無糖可樂是小明的最愛"]);
    }

    #[test]
    fn blank_response_is_extraction_error() {
        assert!(matches!(parse_facts("  \n "), Err(GroupmindError::Extraction(_))));
    }

    #[test]
    fn stamp_appends_fullwidth_parenthesised_time() {
        let at = Local.with_ymd_and_hms(2024, 6, 23, 8, 5, 9).unwrap();
        let stamped = stamp_facts(&["測試事實".to_string()], at);
        assert_eq!(stamped, ["測試事實（2024-06-23 08:05:09）"]);
    }

    #[tokio::test]
    async fn extract_sends_system_prompt_and_context() {
        let provider = Arc::new(MockProvider::with_responses(vec!["- 事實一\n- 事實二".into()]));
        let extractor = FactExtractor::new(provider.clone(), "gpt-4o");

        let facts = extractor
            .extract(&[CacheEntry::new("阿明", "週五要搬家")])
            .await
            .unwrap();
        assert_eq!(facts, ["事實一", "事實二"]);

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(requests[0].system_prompt.as_deref(), Some(EXTRACTION_SYSTEM_PROMPT));
        assert!(requests[0].messages[0].content.ends_with("對話如下：\n阿明：週五要搬家"));
    }
}
