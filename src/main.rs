use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use docrag_cli::{display_banner, prompt_secret, run_interactive, BannerInfo, Session};
use docrag_core::{EmbedderKind, Embedder, PipelineConfig, RAGEngine, RAGQuery};
use docrag_gemini::{GeminiClient, GeminiConfig, GeminiEmbedder};
use docrag_rag::{
    docx_supported, extract_text, read_chunks, resolve_document, write_chunks, Chunker, ChunkingConfig, DocumentFormat,
    HashEmbedder, Indexer, IndexingConfig, LocalRAGEngine, VectorIndex,
};

const MISSING_KEY_WARNING: &str = "Please enter your Gemini API key to start.";

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Ask questions about a document with retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the source document
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path of the chunk store (JSON lines)
    #[arg(long, global = true)]
    chunks: Option<PathBuf>,

    /// Directory holding the index artifacts
    #[arg(long, global = true)]
    vectordb: Option<PathBuf>,

    /// Embedding backend: local or gemini
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the document and write the chunk store
    Ingest(IngestArgs),
    /// Embed the chunk store and write the index
    Index,
    /// Ingest, then index
    Build(IngestArgs),
    /// Answer a single question
    Ask {
        question: String,
        /// Number of passages to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Start the interactive shell (default)
    Chat {
        /// Number of passages to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the models, vector store and number of chunks
    Info,
}

#[derive(clap::Args)]
struct IngestArgs {
    /// Use this document instead of searching the data directory
    #[arg(long)]
    document: Option<PathBuf>,

    #[arg(long)]
    min_words: Option<usize>,

    #[arg(long)]
    max_words: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(docx = docx_supported(), "Document format support");

    let mut config = PipelineConfig::from_env()?;
    apply_overrides(&mut config, &cli);

    match cli.command.unwrap_or(Commands::Chat { top_k: None }) {
        Commands::Ingest(args) => {
            ingest(&mut config, &args)?;
        }
        Commands::Index => {
            index(&config).await?;
        }
        Commands::Build(args) => {
            ingest(&mut config, &args)?;
            index(&config).await?;
        }
        Commands::Ask { question, top_k } => {
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            config.validate()?;
            let Some(engine) = load_engine(&config)? else {
                return Ok(());
            };
            ask(&engine, &question, config.top_k).await?;
        }
        Commands::Chat { top_k } => {
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            config.validate()?;
            let Some(engine) = load_engine(&config)? else {
                return Ok(());
            };
            run_interactive(&engine, Session::new(config.top_k)).await?;
        }
        Commands::Info => show_info(&config)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut PipelineConfig, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(path) = &cli.chunks {
        config.chunks_path = path.clone();
    }
    if let Some(dir) = &cli.vectordb {
        config.vectordb_dir = dir.clone();
    }
    if let Some(kind) = cli.embedder {
        config.embedder = kind;
    }
}

/// Extract, chunk and persist the document's passages
fn ingest(config: &mut PipelineConfig, args: &IngestArgs) -> Result<()> {
    if let Some(min) = args.min_words {
        config.min_words = min;
    }
    if let Some(max) = args.max_words {
        config.max_words = max;
    }
    config.validate()?;

    let document = resolve_document(args.document.as_deref(), &config.data_dir)?;
    let format = DocumentFormat::from_path(&document)?;
    println!(
        "{} Reading {} ({})",
        "📄".blue(),
        document.display(),
        format.display_name()
    );

    let raw_text = extract_text(&document)?;
    let chunker = Chunker::new(ChunkingConfig::new(config.min_words, config.max_words)?);
    let passages = chunker.passages(&raw_text);
    if passages.is_empty() {
        return Err(docrag_core::Error::EmptyCorpus.into());
    }

    write_chunks(&config.chunks_path, &passages)?;
    info!(
        chunks = passages.len(),
        path = %config.chunks_path.display(),
        "Wrote chunk store"
    );
    println!(
        "{} Saved {} chunks to {}",
        "✅".green(),
        passages.len(),
        config.chunks_path.display()
    );
    Ok(())
}

/// Embed the chunk store and persist the index artifacts
async fn index(config: &PipelineConfig) -> Result<()> {
    config.validate()?;
    let passages = read_chunks(&config.chunks_path)?;

    let api_key = match config.embedder {
        EmbedderKind::Local => None,
        EmbedderKind::Gemini => match obtain_api_key()? {
            Some(key) => Some(key),
            None => return Ok(()),
        },
    };
    let embedder = make_embedder(config.embedder, api_key.as_deref())?;

    println!(
        "{} Embedding {} chunks with {}",
        "🧮".blue(),
        passages.len(),
        embedder.model_id()
    );
    let indexer = Indexer::with_config(
        embedder,
        IndexingConfig {
            batch_size: config.batch_size,
        },
    );
    let report = indexer.build_and_save(&passages, &config.vectordb_dir).await?;

    println!(
        "{} Indexed {} chunks ({} dimensions) into {}",
        "✅".green(),
        report.passages_indexed,
        report.dimension,
        config.index_path().display()
    );
    Ok(())
}

async fn ask<R: RAGEngine + ?Sized>(engine: &R, question: &str, top_k: usize) -> Result<()> {
    println!("{}", "🔍 Searching the document...".dimmed());
    let result = engine.answer(&RAGQuery::new(question, top_k)).await?;

    println!("{} {}", "Bot:".green().bold(), result.answer);
    println!();
    for (i, source) in result.sources.iter().enumerate() {
        println!("  {} {}", format!("Source {}:", i + 1).yellow(), source.text);
        debug!(id = source.id, distance = source.distance, "Source passage");
    }
    Ok(())
}

fn show_info(config: &PipelineConfig) -> Result<()> {
    let index = VectorIndex::load(&config.vectordb_dir)?;
    let generation = GeminiConfig::new(String::new()).with_env_overrides();

    display_banner(&BannerInfo {
        generation_model: generation.model,
        embedding_model: index.index().model_id().to_string(),
        vector_store: "flat L2 (exact)".to_string(),
        passages: index.len(),
    });
    println!("  Data directory: {}", config.data_dir.display());
    println!("  Chunk store:    {}", config.chunks_path.display());
    println!("  Index file:     {}", config.index_path().display());
    println!("  Mapping file:   {}", config.mapping_path().display());
    Ok(())
}

/// Load the index and connect the language model.
///
/// Returns `None` when no API key was provided; the warning has already been
/// printed and the caller should exit cleanly.
fn load_engine(config: &PipelineConfig) -> Result<Option<LocalRAGEngine<GeminiClient>>> {
    let index = VectorIndex::load(&config.vectordb_dir)?;
    info!(
        passages = index.len(),
        model = index.index().model_id(),
        path = %config.index_path().display(),
        "Loaded vector index"
    );

    let Some(api_key) = obtain_api_key()? else {
        return Ok(None);
    };

    let embedder = make_embedder(config.embedder, Some(&api_key))?;
    let llm = GeminiClient::new(GeminiConfig::new(api_key).with_env_overrides())?;
    let engine = LocalRAGEngine::from_index(index, embedder, llm)?;
    Ok(Some(engine))
}

fn make_embedder(kind: EmbedderKind, api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match (kind, api_key) {
        (EmbedderKind::Local, _) => Arc::new(HashEmbedder::new()),
        (EmbedderKind::Gemini, Some(key)) => Arc::new(GeminiEmbedder::new(
            GeminiConfig::new(key).with_env_overrides(),
        )?),
        (EmbedderKind::Gemini, None) => Arc::new(GeminiEmbedder::from_env()?),
    };
    Ok(embedder)
}

/// The Gemini key from the environment, else from a masked prompt.
///
/// Prints the missing-key warning and returns `None` if neither yields one.
fn obtain_api_key() -> Result<Option<String>> {
    if let Some(key) = GeminiConfig::api_key_from_env() {
        return Ok(Some(key));
    }

    let key = prompt_secret("Gemini API key:")?;
    if key.is_none() {
        println!("{} {}", "⚠️".yellow(), MISSING_KEY_WARNING.yellow());
    }
    Ok(key)
}
