//! faqdb: build the FAQ corpus and answer questions from the console.
//!
//! Usage:
//!   faqdb build [--source-dir DIR | --manifest FILE] [--dry-run]
//!   faqdb ask "점심시간은 언제인가요?" [--debug]
//!   faqdb chat

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use faqdb_core::config::{resolve_with_base, Config, Settings};
use faqdb_core::traits::SourceStore;
use faqdb_corpus::{CorpusBuilder, DirectorySource, EntryCache, ManifestSource};
use faqdb_embed::get_default_embedder;
use faqdb_generate::GeminiClient;
use faqdb_hybrid::{ask, Answer, ServiceContext};

#[derive(Parser)]
#[command(name = "faqdb", version, about = "Company FAQ retrieval and corpus builder")]
struct Cli {
    /// Base directory that relative config paths resolve against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate entry files from the wiki sources
    Build {
        /// Directory of .txt/.md documents
        #[arg(long, conflicts_with = "manifest")]
        source_dir: Option<String>,
        /// JSON export of the wiki table
        #[arg(long)]
        manifest: Option<String>,
        /// Update the cache but do not write entry files
        #[arg(long)]
        dry_run: bool,
    },
    /// Answer one question
    Ask {
        question: String,
        /// Print how the entry was selected
        #[arg(long)]
        debug: bool,
    },
    /// Interactive session; `exit`, `quit` or `종료` ends it
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = Config::load()?;
    let settings = config.settings()?;
    info!(env = config.env_name(), "configuration loaded");

    match cli.command {
        Command::Build { source_dir, manifest, dry_run } => {
            build(&cli.base_dir, &settings, source_dir, manifest, dry_run).await
        }
        Command::Ask { question, debug } => {
            let (ctx, generator) = serving(&cli.base_dir, &settings).await?;
            answer_one(&ctx, &generator, &question, &settings, debug).await
        }
        Command::Chat => chat(&cli.base_dir, &settings).await,
    }
}

async fn build(
    base: &Path,
    settings: &Settings,
    source_dir: Option<String>,
    manifest: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let manifest = manifest.or_else(|| settings.corpus.manifest.clone());
    let source_dir = source_dir.or_else(|| settings.corpus.source_dir.clone());
    let store: Box<dyn SourceStore> = match (manifest, source_dir) {
        (Some(m), _) => Box::new(ManifestSource::new(resolve_with_base(base, m))),
        (None, Some(d)) => Box::new(DirectorySource::new(resolve_with_base(base, d))),
        (None, None) => bail!("no source configured: pass --source-dir or --manifest, or set corpus.source_dir"),
    };

    let client = Arc::new(GeminiClient::from_settings(&settings.generation)?);
    let mut builder = CorpusBuilder::new(settings, client.clone(), client);
    let mut cache = EntryCache::load(resolve_with_base(base, &settings.corpus.cache_path))?;
    let out_dir = resolve_with_base(base, &settings.corpus.dir);
    let report = builder
        .run(store.as_ref(), &mut cache, if dry_run { None } else { Some(out_dir.as_path()) })
        .await
        .context("corpus build failed")?;

    println!(
        "documents={} reused={} regenerated={} removed={} entries={}",
        report.documents, report.reused, report.regenerated, report.removed, report.entries
    );
    for shard in &report.shards {
        println!("  wrote {}", shard.display());
    }
    Ok(())
}

async fn serving(base: &Path, settings: &Settings) -> Result<(Arc<ServiceContext>, GeminiClient)> {
    let embedder: Arc<dyn faqdb_core::traits::Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let ctx = ServiceContext::load(base, settings, embedder).await.context("loading FAQ entries")?;
    let generator = GeminiClient::from_settings(&settings.generation)?;
    Ok((Arc::new(ctx), generator))
}

async fn answer_one(
    ctx: &Arc<ServiceContext>,
    generator: &GeminiClient,
    question: &str,
    settings: &Settings,
    debug: bool,
) -> Result<()> {
    if debug {
        print_debug(ctx, question)?;
    }
    let timeout = Duration::from_millis(settings.retrieval.embed_timeout_ms);
    let answer = ask(Arc::clone(ctx), generator, question, timeout).await?;
    if debug {
        if let Answer::Generated { selection, .. } = &answer {
            println!("selection: {}", serde_json::to_string(selection)?);
        }
    }
    println!("\n답변:\n{}\n", answer.text());
    Ok(())
}

fn print_debug(ctx: &ServiceContext, question: &str) -> Result<()> {
    if ctx.quick_answer(question).is_some() {
        println!("quick answer");
        return Ok(());
    }
    let normalized = ctx.normalize(question);
    println!("normalized: {}", normalized);
    if let Some(hit) = ctx.keyword_hit(&normalized) {
        let q = ctx.entry(hit.index).map(|e| e.question.as_str()).unwrap_or("?");
        println!("keyword match ({:.2}): {}", hit.score, q);
        return Ok(());
    }
    for (rank, hit) in ctx.vector_candidates(&normalized)?.iter().enumerate() {
        let q = ctx.entry(hit.index).map(|e| e.question.as_str()).unwrap_or("?");
        println!("  {}. [{:.4}] {}", rank + 1, hit.score, q);
    }
    Ok(())
}

async fn chat(base: &Path, settings: &Settings) -> Result<()> {
    let (ctx, generator) = serving(base, settings).await?;
    println!("FAQ 챗봇 (종료: 'exit' 또는 '종료')");
    let stdin = io::stdin();
    loop {
        print!("질문: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "종료") {
            break;
        }
        if let Err(e) = answer_one(&ctx, &generator, question, settings, true).await {
            eprintln!("error: {:#}", e);
        }
    }
    println!("챗봇을 종료합니다.");
    Ok(())
}
