// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `groupmind chat` command implementation.
//!
//! Reads one message per line, records each as a dialogue turn and prints
//! the recall context. With `--reply`, the bot answers from that context and
//! its answer is recorded as a turn under `agent.name`, so the bot's own
//! words reach the cache and the summarization pass like anyone else's.

use std::io::Write;
use std::sync::Arc;

use chrono::Local;
use groupmind_config::GroupmindConfig;
use groupmind_core::types::{ProviderMessage, ProviderRequest};
use groupmind_core::{GroupmindError, ProviderAdapter};
use groupmind_memory::{CacheEntry, MemoryManager, RecallContext};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

const REPLY_SYSTEM_PROMPT: &str = "你是「{name}」，正在群組聊天室裡和大家聊天。\n\
請參考以下記憶，用自然、簡短的口吻回覆最近的對話，不要重複別人說過的話。\n\
現在時間：{now}\n\n{context}";

/// Generates the bot's replies.
pub struct Responder {
    provider: Arc<dyn ProviderAdapter>,
    name: String,
    model: String,
    max_tokens: u32,
}

impl Responder {
    pub fn new(provider: Arc<dyn ProviderAdapter>, config: &GroupmindConfig) -> Self {
        Self {
            provider,
            name: config.agent.name.clone(),
            model: config.openai.chat_model.clone(),
            max_tokens: config.openai.max_tokens,
        }
    }

    fn request(&self, context: &RecallContext, latest: &CacheEntry) -> ProviderRequest {
        let system_prompt = REPLY_SYSTEM_PROMPT
            .replace("{name}", &self.name)
            .replace("{now}", &Local::now().format("%Y-%m-%d %H:%M").to_string())
            .replace("{context}", &context.render());
        ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(system_prompt),
            messages: vec![ProviderMessage::user(latest.recall_line())],
            max_tokens: self.max_tokens,
        }
    }

    async fn reply(
        &self,
        context: &RecallContext,
        latest: &CacheEntry,
    ) -> Result<String, GroupmindError> {
        let response = self.provider.complete(self.request(context, latest)).await?;
        Ok(response.content.trim().to_string())
    }
}

/// Runs the chat loop until `input` is exhausted.
///
/// Blank lines are skipped. A failed reply is logged and the loop moves on.
pub async fn run_chat<R, W>(
    manager: &MemoryManager,
    group: &str,
    user: &str,
    responder: Option<&Responder>,
    input: R,
    out: &mut W,
) -> Result<(), GroupmindError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let report = manager.ingest_dialogue_turn(group, user, text).await?;
        debug!(group, turn = report.turn, summarized = report.summarized, "turn recorded");

        let context = manager.recall(group).await?;
        match responder {
            None => writeln!(out, "{}\n", context.render())?,
            Some(responder) => {
                let latest = CacheEntry::new(user, text);
                match responder.reply(&context, &latest).await {
                    Ok(reply) if reply.is_empty() => {
                        warn!(group, "provider returned an empty reply");
                    }
                    Ok(reply) => {
                        writeln!(out, "{}：{}", responder.name, reply)?;
                        manager
                            .ingest_dialogue_turn(group, &responder.name, &reply)
                            .await?;
                    }
                    Err(e) => warn!(group, error = %e, "reply generation failed"),
                }
            }
        }
        out.flush()?;
    }
    Ok(())
}
