//! Question-answering server binary
//!
//! Run with: cargo run -p pdf-qna --bin pdf-qna-server

use clap::Parser;
use pdf_qna::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdf-qna-server", version, about = "Question answering over an uploaded PDF")]
struct Cli {
    /// TOML configuration file (falls back to PDF_QNA_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_qna=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                          PDF Q&A                          ║
║            Ask questions about an uploaded PDF            ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM backend: {:?}", config.llm.backend);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Index dir: {}", config.storage.index_dir.display());

    let server = RagServer::new(config).await?;

    let state = server.state();
    if state.embedder().health_check().await.unwrap_or(false) {
        tracing::info!("Embedding provider is reachable");
    } else {
        tracing::warn!(
            "Embedding provider not available at {}",
            state.config().embeddings.base_url
        );
        tracing::warn!("Start Ollama and pull the model:");
        tracing::warn!("  ollama serve && ollama pull {}", state.config().embeddings.model);
    }
    if !state.llm().health_check().await.unwrap_or(false) {
        tracing::warn!("LLM provider '{}' did not answer its health check", state.llm().name());
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  Info: http://{}/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload - Upload a PDF");
    println!("  POST /qna    - Ask a question");
    println!("  GET  /clear  - Delete the index");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
