//! Application state for the question-answering server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{LlmBackend, RagConfig};
use crate::error::Result;
use crate::generation::RetrievalQa;
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::providers::{EmbeddingProvider, GroqLlm, LlmProvider, OllamaEmbedder, OllamaLlm};
use crate::retrieval::IndexStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The single persisted index
    store: IndexStore,
    /// Upload-to-index pipeline
    pipeline: IngestPipeline,
    /// Question answering over the live index
    qa: RetrievalQa,
    /// Embedding provider
    embedder: Arc<dyn EmbeddingProvider>,
    /// LLM provider
    llm: Arc<dyn LlmProvider>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with providers chosen by the configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (llm backend: {:?})...",
            config.llm.backend
        );

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(&config.embeddings, &config.llm)?);

        let llm: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::Groq => Arc::new(GroqLlm::new(&config.llm)?),
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        };

        Self::with_providers(config, embedder, llm).await
    }

    /// Create application state around explicit providers
    pub async fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
        let store = IndexStore::open(
            config.storage.index_dir.clone(),
            embedder.model(),
            embedder.dimensions(),
        )
        .await?;

        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
        let pipeline = IngestPipeline::new(chunker, Arc::clone(&embedder));
        let qa = RetrievalQa::new(Arc::clone(&embedder), Arc::clone(&llm), config.retrieval.top_k);

        tracing::info!(
            "Providers ready (embeddings: {}/{}, llm: {}/{})",
            embedder.name(),
            embedder.model(),
            llm.name(),
            llm.model()
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                pipeline,
                qa,
                embedder,
                llm,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the index store
    pub fn store(&self) -> &IndexStore {
        &self.inner.store
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Get the QA chain
    pub fn qa(&self) -> &RetrievalQa {
        &self.inner.qa
    }

    /// Get the embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    /// Get the LLM provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
