// SPDX-FileCopyrightText: 2026 Groupmind Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groupmind - a group chat companion with short-term and long-term memory.
//!
//! This is the binary entry point. Every subcommand loads and validates the
//! configuration, builds the OpenAI-backed memory manager and runs one
//! operation against it.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod chat;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use groupmind_config::GroupmindConfig;
use groupmind_core::{EmbeddingAdapter, GroupmindError, PluginAdapter, ProviderAdapter};
use groupmind_memory::{Category, MemoryManager};
use groupmind_openai::{client_from_config, OpenAiEmbedder, OpenAiProvider};
use tracing::{debug, error};

/// Groupmind - a group chat companion with short-term and long-term memory.
#[derive(Parser, Debug)]
#[command(name = "groupmind", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a text document into a group's knowledge memory, one paragraph per line.
    Ingest { group: String, file: PathBuf },
    /// Read messages from stdin, one per line, as dialogue turns from USER.
    Chat {
        group: String,
        user: String,
        /// Generate a reply after every message and remember it as the bot's own turn.
        #[arg(long)]
        reply: bool,
    },
    /// Search one category of a group's memory.
    Query {
        group: String,
        /// `knowledge` or `dialogue`.
        category: String,
        text: String,
        /// Number of results; defaults to `memory.retrieval_k`.
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Print the recall context for a group's recent conversation.
    Recall { group: String },
    /// Write every document of one category to a timestamped text file.
    Export { group: String, category: String },
    /// Delete one category of a group's memory.
    Clear { group: String, category: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => groupmind_config::load_and_validate_path(path),
        None => groupmind_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            groupmind_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.agent.log_level);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &GroupmindConfig) -> Result<(), GroupmindError> {
    let mut out = std::io::stdout().lock();
    match command {
        Commands::Ingest { group, file } => {
            let (manager, _) = build_memory(config)?;
            commands::run_ingest(&manager, &group, &file, &mut out).await
        }
        Commands::Chat { group, user, reply } => {
            let (manager, provider) = build_memory(config)?;
            let responder = reply.then(|| chat::Responder::new(provider, config));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_chat(&manager, &group, &user, responder.as_ref(), stdin, &mut out).await
        }
        Commands::Query {
            group,
            category,
            text,
            k,
        } => {
            let category = Category::from_tag(&category)?;
            let (manager, _) = build_memory(config)?;
            let k = k.unwrap_or_else(|| manager.retrieval_k());
            commands::run_query(&manager, &group, category, &text, k, &mut out).await
        }
        Commands::Recall { group } => {
            let (manager, _) = build_memory(config)?;
            commands::run_recall(&manager, &group, &mut out).await
        }
        Commands::Export { group, category } => {
            let category = Category::from_tag(&category)?;
            let (manager, _) = build_memory(config)?;
            commands::run_export(&manager, &group, category, &mut out).await
        }
        Commands::Clear { group, category } => {
            let category = Category::from_tag(&category)?;
            let (manager, _) = build_memory(config)?;
            commands::run_clear(&manager, &group, category, &mut out).await
        }
    }
}

/// Builds the memory manager over one shared OpenAI client.
///
/// The provider is returned separately so `chat --reply` can reuse it.
fn build_memory(
    config: &GroupmindConfig,
) -> Result<(MemoryManager, Arc<dyn ProviderAdapter>), GroupmindError> {
    let client = client_from_config(config)?;
    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(OpenAiEmbedder::new(
        client.clone(),
        &config.openai.embedding_model,
    ));
    let provider: Arc<dyn ProviderAdapter> =
        Arc::new(OpenAiProvider::new(client, &config.openai.chat_model));
    debug!(
        embedder = embedder.name(),
        embedder_kind = %embedder.adapter_type(),
        provider = provider.name(),
        provider_kind = %provider.adapter_type(),
        version = %provider.version(),
        "adapters ready"
    );
    let manager = MemoryManager::new(&config.memory, embedder, Arc::clone(&provider));
    Ok((manager, provider))
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("groupmind={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
