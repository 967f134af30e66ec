// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot memory commands: `ingest`, `query`, `recall`, `export`, `clear`.
//!
//! Each takes the output sink explicitly so tests can capture it.

use std::io::Write;
use std::path::Path;

use groupmind_core::GroupmindError;
use groupmind_memory::{split_paragraphs, Category, ExportOutcome, MemoryManager};
use tracing::info;

/// Uploads a text file into the group's knowledge index, one paragraph per line.
pub async fn run_ingest(
    manager: &MemoryManager,
    group: &str,
    file: &Path,
    out: &mut impl Write,
) -> Result<(), GroupmindError> {
    let text = tokio::fs::read_to_string(file).await.map_err(|e| {
        GroupmindError::Validation(format!("cannot read {}: {e}", file.display()))
    })?;
    let paragraphs = split_paragraphs(&text);
    let added = manager.ingest_document(group, &paragraphs).await?;
    info!(group, file = %file.display(), added, "document ingested");
    writeln!(out, "ingested {added} paragraphs into {group}/knowledge")?;
    Ok(())
}

pub async fn run_query(
    manager: &MemoryManager,
    group: &str,
    category: Category,
    text: &str,
    k: usize,
    out: &mut impl Write,
) -> Result<(), GroupmindError> {
    let hits = manager.retrieve(group, category, text, k).await?;
    if hits.is_empty() {
        writeln!(out, "no results")?;
        return Ok(());
    }
    for hit in hits {
        writeln!(out, "{:.4}\t{}", hit.distance, hit.content)?;
    }
    Ok(())
}

/// Prints the recall context. Outside `chat` the cache is empty, so this
/// shows what long-term memory returns for an empty conversation.
pub async fn run_recall(
    manager: &MemoryManager,
    group: &str,
    out: &mut impl Write,
) -> Result<(), GroupmindError> {
    let context = manager.recall(group).await?;
    writeln!(out, "{}", context.render())?;
    Ok(())
}

pub async fn run_export(
    manager: &MemoryManager,
    group: &str,
    category: Category,
    out: &mut impl Write,
) -> Result<(), GroupmindError> {
    match manager.export_category(group, category).await? {
        ExportOutcome::Written { path, count } => {
            writeln!(out, "exported {count} documents to {}", path.display())?;
        }
        ExportOutcome::Empty => {
            writeln!(out, "{group}/{category} has no documents")?;
        }
    }
    Ok(())
}

pub async fn run_clear(
    manager: &MemoryManager,
    group: &str,
    category: Category,
    out: &mut impl Write,
) -> Result<(), GroupmindError> {
    manager.clear_category(group, category).await?;
    writeln!(out, "cleared {group}/{category}")?;
    Ok(())
}
