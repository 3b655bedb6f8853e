use chrono::Utc;
use clap::{Parser, Subcommand};
use docchat_core::{
    ChatEngine, ChunkingConfig, DiskVectorStore, DocumentIngestor, EmbeddingProvider, Generator,
    OpenAiGenerator, PageIndex,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docchat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the persisted chunk collection.
    #[arg(long, default_value = "./docchat_db", global = true)]
    data_dir: PathBuf,

    /// OpenAI API key; hosted embeddings and generation are skipped without it.
    #[arg(long, env = "OPENAI_API_KEY", global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document file, or every supported document under a folder.
    Ingest {
        /// A PDF/DOC/DOCX file, or a folder searched recursively.
        path: PathBuf,
        /// Chunk size in words.
        #[arg(long, default_value = "1500")]
        chunk_size: usize,
        /// Chunk overlap in words.
        #[arg(long, default_value = "300")]
        overlap: usize,
    },
    /// Ask a question about the ingested documents.
    Ask {
        /// The question.
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docchat boot"
    );

    let store = Arc::new(
        DiskVectorStore::open(&cli.data_dir)
            .map_err(|error| anyhow::anyhow!(error.to_string()))?,
    );
    let pages = Arc::new(PageIndex::new());
    let embedder = Arc::new(EmbeddingProvider::from_api_key(cli.api_key.clone()));

    match cli.command {
        Command::Ingest {
            path,
            chunk_size,
            overlap,
        } => {
            let config = ChunkingConfig {
                chunk_size,
                overlap,
            };
            let ingestor = DocumentIngestor::new(
                Arc::clone(&store),
                Arc::clone(&pages),
                Arc::clone(&embedder),
                config,
            );

            if path.is_dir() {
                let report = ingestor
                    .ingest_folder(&path)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                if !report.skipped_files.is_empty() {
                    warn!(
                        "skipped_files={} for folder={}",
                        report.skipped_files.len(),
                        path.display()
                    );
                    for skipped in report.skipped_files {
                        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
                    }
                }

                println!(
                    "{} document(s) ingested at {}",
                    report.document_ids.len(),
                    Utc::now().to_rfc3339()
                );
            } else {
                let document_id = ingestor
                    .ingest_file(&path)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                println!("ingested {} as {document_id}", path.display());
            }
        }
        Command::Ask { query } => {
            let generator: Option<Arc<dyn Generator>> = match cli.api_key.as_deref() {
                Some(key) if !key.is_empty() => Some(Arc::new(
                    OpenAiGenerator::from_api_key(key)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?,
                )),
                _ => None,
            };

            let engine = ChatEngine::new(store, pages, embedder, generator);
            let response = engine.query(&query).await;

            println!("{}", response.answer);
            for source in response.sources {
                println!("source: {source}");
            }
        }
    }

    Ok(())
}
