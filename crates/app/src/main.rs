use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_assist_core::{
    CharacterNgramEmbedder, ChunkingOptions, ExtractiveGenerator, Generator, GroundingPolicy,
    HttpGenerator, IngestionPipeline, LocalStore, MediaType, OpenOutcome, QueryEngine,
    DEFAULT_TOP_K,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-assist", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the local vector index snapshot.
    #[arg(long, default_value = "doc_index")]
    index_dir: String,

    /// Remote generation endpoint. When unset, answers are composed from the
    /// retrieved passages directly.
    #[arg(long, env = "GENERATOR_ENDPOINT")]
    generator_url: Option<String>,

    /// Bearer token for the generation endpoint.
    #[arg(long, env = "GENERATOR_API_KEY")]
    generator_api_key: Option<String>,

    /// Timeout in seconds for external calls.
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one document, or every supported document under a folder.
    Ingest {
        /// Single file to ingest (pdf, txt, or md).
        #[arg(long, conflicts_with = "folder")]
        file: Option<String>,
        /// Folder to ingest recursively, best effort.
        #[arg(long)]
        folder: Option<String>,
        /// Target chunk size in characters.
        #[arg(long, default_value = "1000")]
        chunk_size: usize,
        /// Characters shared between consecutive chunks.
        #[arg(long, default_value = "200")]
        chunk_overlap: usize,
    },
    /// Ask a question grounded in the ingested documents.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Decline instead of answering from general knowledge when no
        /// relevant documents are found.
        #[arg(long, default_value_t = false)]
        decline_when_ungrounded: bool,
    },
    /// Show the stored chunk count and the ingested sources.
    Status,
    /// Clear the index and delete its snapshot.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    let index_dir = PathBuf::from(&cli.index_dir);
    std::fs::create_dir_all(&index_dir)?;
    let snapshot = index_dir.join("chunks.json");

    let (store, outcome) = LocalStore::open_or_create(&snapshot)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    info!(
        version = app_version,
        index = %snapshot.display(),
        opened_existing = matches!(outcome, OpenOutcome::OpenedExisting { .. }),
        started_at = %Utc::now().to_rfc3339(),
        "doc-assist boot"
    );

    match cli.command {
        Command::Ingest {
            file,
            folder,
            chunk_size,
            chunk_overlap,
        } => {
            let options = ChunkingOptions {
                chunk_size,
                chunk_overlap,
            };
            let pipeline = IngestionPipeline::new(store, CharacterNgramEmbedder::default(), options);

            match (file, folder) {
                (Some(file), None) => {
                    let path = Path::new(&file);
                    let media_type = MediaType::for_path(path)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    let source = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .ok_or_else(|| anyhow::anyhow!("path has no file name: {file}"))?;

                    let bytes = tokio::fs::read(path).await?;
                    let chunk_count = pipeline
                        .ingest_document(&bytes, media_type, source)
                        .await
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                    println!(
                        "{chunk_count} chunks ingested from {source} at {}",
                        Utc::now().to_rfc3339()
                    );
                }
                (None, Some(folder)) => {
                    let report = pipeline
                        .ingest_folder(Path::new(&folder))
                        .await
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                    for skipped in &report.skipped {
                        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                    }

                    let total: u64 = report.ingested.iter().map(|(_, count)| count).sum();
                    println!(
                        "{} files ingested ({total} chunks), {} skipped",
                        report.ingested.len(),
                        report.skipped.len()
                    );
                }
                _ => anyhow::bail!("pass exactly one of --file or --folder"),
            }

            let total = pipeline
                .document_count()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("index now holds {total} chunks");
        }
        Command::Ask {
            question,
            top_k,
            decline_when_ungrounded,
        } => {
            let generator: Box<dyn Generator + Send + Sync> = match &cli.generator_url {
                Some(url) => Box::new(
                    HttpGenerator::new(url, cli.generator_api_key.clone(), timeout)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?,
                ),
                None => Box::new(ExtractiveGenerator),
            };

            let policy = if decline_when_ungrounded {
                GroundingPolicy::Decline
            } else {
                GroundingPolicy::GeneralKnowledge
            };

            let engine = QueryEngine::new(store, generator, CharacterNgramEmbedder::default())
                .with_policy(policy);

            let answer = engine
                .ask(&question, top_k)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{}", answer.text);
            if answer.grounded {
                println!(
                    "sources: {}",
                    answer.sources.iter().cloned().collect::<Vec<_>>().join(", ")
                );
            } else {
                println!("(no relevant documents found; answer is not grounded)");
            }
        }
        Command::Status => {
            use doc_assist_core::VectorIndex;

            let count = store
                .count()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let sources = store
                .sources()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("chunks: {count}");
            println!("sources: {}", sources.len());
            for source in sources {
                println!("  {source}");
            }
        }
        Command::Reset => {
            store
                .reset()
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("index cleared");
        }
    }

    Ok(())
}
